//! Diff Engine: classifies a target file's keys against its source as
//! missing, outdated, or current.
//!
//! Grounded on the update-command's key-diffing step (`test_key_counting.py`,
//! `test_in_place_updates.py`): missing keys are plain set difference over
//! the flattened trees; the remaining shared keys are candidates for the
//! git-blame outdated check, which only runs when both files live inside a
//! git work tree and falls back to a timestamp comparison otherwise.

pub mod line_lookup;

use std::path::Path;

use anyhow::Result;

use crate::{
    git::BlameCache,
    registry::FormatHandler,
    resource_map::{FlatMap, KeySet},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Missing,
    Outdated,
    Current,
}

#[derive(Debug, Clone)]
pub struct DiffResult {
    pub missing: KeySet,
    pub outdated: KeySet,
    pub current: KeySet,
}

impl DiffResult {
    /// Every key that needs a fresh translation: missing plus outdated.
    pub fn needs_translation(&self) -> KeySet {
        let mut combined = self.missing.0.clone();
        combined.extend(self.outdated.0.iter().cloned());
        KeySet(combined)
    }
}

/// Compare `source_flat` (the source-language file's flattened content)
/// against `target_flat` (the target-language file's). `source_path`/
/// `target_path` are used for git-blame outdated detection when `blame`
/// is available and both files are tracked; `line_lookup` resolves a key
/// to a line number for the blame call.
pub fn diff(
    source_flat: &FlatMap,
    target_flat: &FlatMap,
    source_path: &Path,
    target_path: &Path,
    blame: &BlameCache,
    handler: &dyn FormatHandler,
) -> Result<DiffResult> {
    let source_keys = source_flat.key_set();
    let target_keys = target_flat.key_set();

    let missing = source_keys.difference(&target_keys);
    let shared = source_keys.intersection(&target_keys);

    // Only keys whose value actually differs between source and target are
    // candidates for the (expensive) git-blame outdated check; a key whose
    // translation is untouched can't have gone stale no matter what the
    // timestamps say.
    let (changed, unchanged): (std::collections::BTreeSet<String>, std::collections::BTreeSet<String>) = shared
        .iter()
        .map(|key| key.to_string())
        .partition(|key| source_flat.get(key) != target_flat.get(key));

    let mut outdated = std::collections::BTreeSet::new();
    let mut current = unchanged;

    if blame.is_available() {
        for key in &changed {
            let is_outdated = check_outdated_via_blame(key, source_path, target_path, blame, handler)?;
            if is_outdated {
                outdated.insert(key.to_string());
            } else {
                current.insert(key.to_string());
            }
        }
    } else {
        // No git work tree: every shared key is assumed current. The
        // mtime fallback (source newer than target) is applied by the
        // Orchestrator, which has both files' metadata already.
        current.extend(changed);
    }

    Ok(DiffResult {
        missing,
        outdated: KeySet(outdated),
        current: KeySet(current),
    })
}

fn check_outdated_via_blame(
    key: &str,
    source_path: &Path,
    target_path: &Path,
    blame: &BlameCache,
    handler: &dyn FormatHandler,
) -> Result<bool> {
    let Some(source_line) = line_lookup::line_for_key(source_path, key, handler)? else {
        return Ok(false);
    };
    let Some(target_line) = line_lookup::line_for_key(target_path, key, handler)? else {
        return Ok(false);
    };

    let target_blame = blame.blame_lines(target_path, &[target_line])?;
    let Some(target_info) = target_blame.get(&target_line) else {
        return Ok(false);
    };

    let source_blame = blame.blame_lines(source_path, &[source_line])?;
    let Some(source_info) = source_blame.get(&source_line) else {
        return Ok(false);
    };

    Ok(source_info.authored_at > target_info.authored_at)
}

/// Compare a target file's mtime against the source file's, used as the
/// non-git fallback outdated signal.
pub fn is_outdated_by_mtime(source_path: &Path, target_path: &Path) -> bool {
    let source_mtime = std::fs::metadata(source_path).and_then(|m| m.modified());
    let target_mtime = std::fs::metadata(target_path).and_then(|m| m.modified());
    match (source_mtime, target_mtime) {
        (Ok(s), Ok(t)) => s > t,
        _ => false,
    }
}
