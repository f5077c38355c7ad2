//! Sync Orchestrator: wires Scanner, Diff Engine, Translator Driver and
//! Writer Selection into the three run flows -- translate, update, ci --
//! plus the read-only status flow.
//!
//! Grounded on `translate_command.py`/`update_command.py`/
//! `status_command.py`'s top-level `execute()` shape: resolve config,
//! scan source files, for each target locale resolve (or derive) the
//! destination path, diff against the existing target file when one
//! exists, translate what's needed, and write back through whichever
//! writer the format supports (§4.5).

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::{
    config::Config,
    diff::{self, DiffResult},
    git::BlameCache,
    path_resolver::{derive_target_path, resolve_destination},
    registry::{self, FormatHandler},
    resource_map::KeySet,
    scanner,
    translator::{PendingString, TranslationProvider, TranslatorDriver},
};

/// Per-run overrides a `translate` invocation can layer on top of the
/// configured defaults. `update`/`ci`/`status` don't carry these -- they
/// always diff against the existing target and translate only what's
/// missing or outdated.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Translate every source key even if the target file already exists,
    /// skipping the diff entirely.
    pub force: bool,
    /// Translate only keys missing from the target file; outdated-by-git
    /// or outdated-by-mtime keys are left alone.
    pub only_missing: bool,
    pub ui_safe: bool,
    pub batch_size: Option<usize>,
    pub max_parallel_batches: Option<usize>,
    pub glossary_id: Option<String>,
    pub prompt: Option<String>,
}

/// What kind of run produced a [`RunSummary`]; purely informational, used
/// by the CLI report to phrase the final line differently per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Translate,
    Update,
    Ci,
    Status,
}

#[derive(Debug, Clone, Default)]
pub struct FileSummary {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub locale: String,
    pub translated_keys: usize,
    pub skipped_keys: usize,
    /// Keys the provider rejected even as a single-element batch; see
    /// `TranslatorDriver::translate_batch`'s `BatchResult::failed_keys`.
    pub failed_keys: usize,
    pub wrote_in_place: bool,
}

/// Aggregate result of one orchestrator run, the shape the CLI's
/// `report` module and `ExitStatus` mapping both consume.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn total_translated(&self) -> usize {
        self.files.iter().map(|f| f.translated_keys).sum()
    }

    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || self.files.iter().any(|f| f.translated_keys > 0)
    }
}

pub struct Orchestrator<'a> {
    root: PathBuf,
    config: Config,
    provider: &'a dyn TranslationProvider,
    blame: BlameCache,
}

impl<'a> Orchestrator<'a> {
    pub fn new(root: PathBuf, config: Config, provider: &'a dyn TranslationProvider) -> Self {
        let blame = BlameCache::discover(&root);
        Self { root, config, provider, blame }
    }

    /// `algebras translate`: by default, diff existing target files
    /// against the source and translate only missing/outdated keys --
    /// the same diff `update` runs. `options.force` skips the diff and
    /// rewrites every key; `options.only_missing` narrows the diff to
    /// missing keys only, leaving outdated-by-git/mtime keys alone.
    pub fn translate(&self, only_locale: Option<&str>, options: &TranslateOptions) -> Result<RunSummary> {
        self.run(RunKind::Translate, only_locale, Some(options))
    }

    /// `algebras update`: diff existing target files against the source
    /// and translate only missing/outdated keys.
    pub fn update(&self, only_locale: Option<&str>) -> Result<RunSummary> {
        self.run(RunKind::Update, only_locale, None)
    }

    /// `algebras ci`: same diff as update, but never writes; a non-empty
    /// result is a failing check.
    pub fn ci(&self, only_locale: Option<&str>) -> Result<RunSummary> {
        self.run(RunKind::Ci, only_locale, None)
    }

    /// `algebras status`: reports completion percentage per locale
    /// without translating or writing anything.
    pub fn status(&self, only_locale: Option<&str>) -> Result<RunSummary> {
        self.run(RunKind::Status, only_locale, None)
    }

    fn run(&self, kind: RunKind, only_locale: Option<&str>, options: Option<&TranslateOptions>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let grouped = scanner::group_files_by_language(&self.root, &self.config);
        let source_language = self.config.source_language();

        let Some(source_files) = grouped.get(&source_language) else {
            summary.errors.push(format!("no source-language ({source_language}) files found"));
            return Ok(summary);
        };

        for source_path in source_files {
            let Some(handler) = registry::handler_for(source_path) else {
                continue;
            };
            let source_map = match handler.read(source_path) {
                Ok(map) => map,
                Err(e) => {
                    summary.errors.push(format!("{}: {e}", source_path.display()));
                    continue;
                }
            };
            let source_flat = source_map.flatten();

            for target in self.config.target_languages() {
                if let Some(only) = only_locale {
                    if target.internal() != only {
                        continue;
                    }
                }
                match self.sync_one_target(kind, handler, source_path, &source_flat, target.internal(), options) {
                    Ok(file_summary) => summary.files.push(file_summary),
                    Err(e) => summary.errors.push(format!("{}: {e}", source_path.display())),
                }
            }
        }

        Ok(summary)
    }

    fn target_path_for(&self, source_path: &Path, source_locale: &str, target_locale: &str) -> PathBuf {
        let relative = source_path.strip_prefix(&self.root).unwrap_or(source_path);
        if let Some(source_key) = self
            .config
            .source_files
            .keys()
            .find(|k| Path::new(k) == relative)
        {
            let binding = &self.config.source_files[source_key];
            return self.root.join(resolve_destination(&binding.destination_path, target_locale, &self.config));
        }
        derive_target_path(source_path, source_locale, target_locale, &self.config)
    }

    fn sync_one_target(
        &self,
        kind: RunKind,
        handler: &dyn FormatHandler,
        source_path: &Path,
        source_flat: &crate::resource_map::FlatMap,
        target_locale: &str,
        options: Option<&TranslateOptions>,
    ) -> Result<FileSummary> {
        let source_locale = self.config.source_language();
        let target_path = self.target_path_for(source_path, &source_locale, target_locale);

        let mut summary = FileSummary {
            source_path: source_path.to_path_buf(),
            target_path: target_path.clone(),
            locale: target_locale.to_string(),
            ..Default::default()
        };

        let target_exists = target_path.is_file();
        let target_map = if target_exists {
            Some(handler.read(&target_path)?)
        } else {
            None
        };

        let force = kind == RunKind::Translate && options.map(|o| o.force).unwrap_or(false);
        let only_missing = kind == RunKind::Translate && options.map(|o| o.only_missing).unwrap_or(false);

        let keys_to_translate: KeySet = match (kind, &target_map, force) {
            (RunKind::Status, _, _) => KeySet::default(),
            (_, _, true) => source_flat.key_set(),
            (_, None, false) => source_flat.key_set(),
            (_, Some(existing), false) => {
                let diff_result = self.diff_against(source_flat, existing, source_path, &target_path, handler)?;
                report_diff(&diff_result, &target_path);
                if only_missing {
                    diff_result.missing
                } else {
                    diff_result.needs_translation()
                }
            }
        };

        if kind == RunKind::Status {
            let existing_keys = target_map.as_ref().map(|m| m.flatten().key_set()).unwrap_or_default();
            summary.skipped_keys = source_flat.key_set().intersection(&existing_keys).len();
            return Ok(summary);
        }

        if keys_to_translate.is_empty() {
            return Ok(summary);
        }

        if kind == RunKind::Ci {
            summary.translated_keys = keys_to_translate.len();
            return Ok(summary);
        }

        let pending: Vec<PendingString> = keys_to_translate
            .iter()
            .filter_map(|key| source_flat.get(key).map(|text| PendingString { key: key.to_string(), source_text: text.to_string() }))
            .collect();

        let batch_size = options.and_then(|o| o.batch_size).unwrap_or(self.config.batch_size);
        let max_parallel_batches = options
            .and_then(|o| o.max_parallel_batches)
            .unwrap_or(self.config.max_parallel_batches);
        let driver = TranslatorDriver::new(self.provider, batch_size, max_parallel_batches).with_job_options(
            options.map(|o| o.ui_safe).unwrap_or(false),
            options.and_then(|o| o.glossary_id.clone()).or_else(|| self.config.api.glossary_id.clone()),
            options.and_then(|o| o.prompt.clone()).or_else(|| self.config.api.prompt.clone()),
        );
        let result = driver.translate_batch(&pending, target_locale)?;

        if !result.failed_keys.is_empty() {
            warn!(
                "{}: {} key(s) could not be translated and were skipped: {}",
                target_path.display(),
                result.failed_keys.len(),
                result.failed_keys.join(", ")
            );
        }

        let mut working_map = target_map.unwrap_or_else(crate::resource_map::ResourceMap::empty);
        for entry in &result.translated {
            working_map.set_path(&entry.key, entry.translated_text.clone());
        }

        let wrote_in_place = handler.supports_in_place()
            && handler
                .write_in_place_configured(&target_path, &working_map, &keys_to_translate, &self.config)
                .transpose()?
                .is_some();

        if !wrote_in_place {
            handler.write_full_configured(&target_path, &working_map, &self.config)?;
        }

        summary.translated_keys = result.translated.len();
        summary.failed_keys = result.failed_keys.len();
        summary.wrote_in_place = wrote_in_place;
        Ok(summary)
    }

    fn diff_against(
        &self,
        source_flat: &crate::resource_map::FlatMap,
        target_map: &crate::resource_map::ResourceMap,
        source_path: &Path,
        target_path: &Path,
        handler: &dyn FormatHandler,
    ) -> Result<DiffResult> {
        let target_flat = target_map.flatten();
        let mut result = diff::diff(source_flat, &target_flat, source_path, target_path, &self.blame, handler)?;

        if !self.blame.is_available() && diff::is_outdated_by_mtime(source_path, target_path) {
            let promoted = result.current.0.clone();
            result.outdated.0.extend(promoted);
            result.current = KeySet::default();
        }
        Ok(result)
    }
}

fn report_diff(diff_result: &DiffResult, target_path: &Path) {
    if !diff_result.missing.is_empty() {
        info!("{}: {} missing key(s)", target_path.display(), diff_result.missing.len());
    }
    if !diff_result.outdated.is_empty() {
        warn!("{}: {} outdated key(s)", target_path.display(), diff_result.outdated.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locale::LocaleEntry, translator::provider::IdentityProvider};
    use std::fs;
    use tempfile::tempdir;

    fn config_with_languages(codes: &[&str]) -> Config {
        Config {
            languages: codes.iter().map(|c| LocaleEntry::Bare(c.to_string())).collect(),
            source_language: Some(codes[0].to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn translate_writes_every_target_locale_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.json"), r#"{"greeting": "Hi"}"#).unwrap();

        let config = config_with_languages(&["en", "fr"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), config, &IdentityProvider);
        let summary = orchestrator.translate(None, &TranslateOptions::default()).unwrap();

        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].locale, "fr");
        assert!(summary.files[0].target_path.is_file());
    }

    #[test]
    fn only_missing_leaves_existing_keys_untouched() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.json"), r#"{"a": "A", "b": "B"}"#).unwrap();
        fs::write(dir.path().join("locales/fr.json"), r#"{"a": "x"}"#).unwrap();

        let config = config_with_languages(&["en", "fr"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), config, &IdentityProvider);
        let options = TranslateOptions {
            only_missing: true,
            ..TranslateOptions::default()
        };
        let summary = orchestrator.translate(None, &options).unwrap();

        assert_eq!(summary.files[0].translated_keys, 1);
        let written = fs::read_to_string(dir.path().join("locales/fr.json")).unwrap();
        assert!(written.contains("\"a\": \"x\""), "untouched key must keep its original value: {written}");
        assert!(written.contains("\"b\": \"B\""), "missing key must be translated: {written}");
    }

    #[test]
    fn force_rewrites_every_key_even_when_target_exists() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.json"), r#"{"a": "A"}"#).unwrap();
        fs::write(dir.path().join("locales/fr.json"), r#"{"a": "stale"}"#).unwrap();

        let config = config_with_languages(&["en", "fr"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), config, &IdentityProvider);
        let options = TranslateOptions {
            force: true,
            ..TranslateOptions::default()
        };
        let summary = orchestrator.translate(None, &options).unwrap();

        assert_eq!(summary.files[0].translated_keys, 1);
        let written = fs::read_to_string(dir.path().join("locales/fr.json")).unwrap();
        assert!(written.contains("\"a\": \"A\""), "force must rewrite the existing key: {written}");
    }

    #[test]
    fn update_only_translates_missing_keys() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.json"), r#"{"a": "A", "b": "B"}"#).unwrap();
        fs::write(dir.path().join("locales/fr.json"), r#"{"a": "A-fr"}"#).unwrap();

        let config = config_with_languages(&["en", "fr"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), config, &IdentityProvider);
        let summary = orchestrator.update(None).unwrap();

        assert_eq!(summary.files[0].translated_keys, 1);
    }

    #[test]
    fn ci_reports_without_writing() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(dir.path().join("locales/en.json"), r#"{"a": "A"}"#).unwrap();

        let config = config_with_languages(&["en", "fr"]);
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), config, &IdentityProvider);
        let summary = orchestrator.ci(None).unwrap();

        assert_eq!(summary.files[0].translated_keys, 1);
        assert!(!dir.path().join("locales/fr.json").exists());
    }
}
