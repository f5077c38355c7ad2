//! File Scanner: discovers localization files and groups them by locale.
//!
//! Grounded on `file_scanner.py`'s `FileScanner`. When `source_files` is
//! configured, scanning is driven entirely by that explicit map (each key
//! is a source file, each value's `destination_path` resolves per target
//! locale via [`crate::path_resolver::resolve_destination`]). Otherwise it
//! falls back to the same fixed list of glob patterns the original tries
//! before handing off to `path_rules`, then classifies each match by
//! locale using the Android `values(-xx)?` convention and
//! [`crate::path_resolver::reverse_locale_lookup`].

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use glob::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::{
    config::Config,
    path_resolver::{derive_target_path, resolve_destination},
};

/// Patterns tried, in order, when no `source_files` map is configured.
/// Mirrors `specific_locale_patterns` in the original scanner.
const FALLBACK_PATTERNS: &[&str] = &[
    "src/locales/*.json",
    "locales/*.json",
    "src/i18n/*.json",
    "i18n/*.json",
    "public/locales/*/*.json",
    "*.lproj/*.strings",
    "**/*.strings",
    "**/*.stringsdict",
    "**/values/*.xml",
    "**/values-*/*.xml",
    "**/*.po",
    "**/*.xlf",
    "**/*.xliff",
    "**/*.properties",
    "**/locales/*.csv",
    "**/*.csv",
    "**/locales/*.tsv",
    "**/*.tsv",
];

static VALUES_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^values(?:-([A-Za-z0-9-]+))?$").unwrap());

/// Find every file in `root` matching the scan configuration. Returns
/// normalized, de-duplicated, sorted paths.
pub fn find_localization_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut found = std::collections::BTreeSet::new();

    if !config.source_files.is_empty() {
        for source_file in config.source_files.keys() {
            let path = root.join(source_file);
            if path.is_file() {
                found.insert(path);
            }
        }
        return found.into_iter().collect();
    }

    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for rule in &config.path_rules {
        match rule.strip_prefix('!') {
            Some(bare) => exclude.push(bare.to_string()),
            None => include.push(rule.clone()),
        }
    }

    let all_patterns: Vec<&str> = FALLBACK_PATTERNS
        .iter()
        .copied()
        .chain(include.iter().map(String::as_str))
        .collect();

    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        let matches_include = all_patterns.iter().any(|p| glob_matches(p, &relative_str));
        if !matches_include {
            continue;
        }
        let matches_exclude = exclude.iter().any(|p| glob_matches(p, &relative_str));
        if matches_exclude {
            continue;
        }
        found.insert(entry.path().to_path_buf());
    }

    found.into_iter().collect()
}

fn glob_matches(pattern: &str, path: &str) -> bool {
    Pattern::new(pattern).map(|p| p.matches(path)).unwrap_or(false)
}

/// Group every file found by [`find_localization_files`] into a map of
/// internal locale code -> file paths. Mirrors `group_files_by_language`.
pub fn group_files_by_language(root: &Path, config: &Config) -> BTreeMap<String, Vec<PathBuf>> {
    let source_language = config.source_language();
    let mut result: BTreeMap<String, Vec<PathBuf>> = config
        .languages
        .iter()
        .map(|l| (l.internal().to_string(), Vec::new()))
        .collect();
    result.entry(source_language.clone()).or_default();

    if !config.source_files.is_empty() {
        for (source_file, binding) in &config.source_files {
            let source_path = root.join(source_file);
            if !source_path.is_file() {
                continue;
            }
            result.entry(source_language.clone()).or_default().push(source_path.clone());

            for target in config.target_languages() {
                let resolved = resolve_destination(&binding.destination_path, target.internal(), config);
                let resolved = root.join(resolved);
                if resolved.is_file() {
                    result
                        .entry(target.internal().to_string())
                        .or_default()
                        .push(resolved);
                }
            }
        }
        return result;
    }

    for file_path in find_localization_files(root, config) {
        if let Some(locale) = classify_by_values_dir(&file_path, config) {
            result.entry(locale).or_default().push(file_path);
            continue;
        }
        if let Some(locale) = classify_by_derived_path(&file_path, &source_language, config) {
            result.entry(locale).or_default().push(file_path);
            continue;
        }
        // Files that carry no locale marker at all are assumed to be
        // source-language files (the common case: a single `en.json`).
        result.entry(source_language.clone()).or_default().push(file_path);
    }

    result
}

fn classify_by_values_dir(file_path: &Path, config: &Config) -> Option<String> {
    let dir_name = file_path.parent()?.file_name()?.to_str()?;
    let caps = VALUES_DIR.captures(dir_name)?;
    match caps.get(1) {
        None => Some(config.source_language()),
        Some(suffix) => crate::path_resolver::reverse_locale_lookup(suffix.as_str(), config)
            .or_else(|| Some(suffix.as_str().to_string())),
    }
}

/// For every configured target locale, check whether deriving that
/// locale's expected path from this file (treating it as a source file)
/// round-trips back to itself -- if so, this file already sits at the
/// target locale's conventional location.
fn classify_by_derived_path(file_path: &Path, source_language: &str, config: &Config) -> Option<String> {
    for target in config.target_languages() {
        let derived = derive_target_path(file_path, source_language, target.internal(), config);
        if derived == file_path {
            return Some(target.internal().to_string());
        }
    }
    None
}
