//! Configuration file loading and validation.
//!
//! Mirrors the teacher's load/validate/default skeleton: a `Config` struct
//! with per-field `#[serde(default = "...")]` functions, a parent-directory
//! walk that stops at the repo boundary, and a `ConfigLoadResult` that
//! distinguishes "loaded from file" from "fell back to defaults" so callers
//! can decide whether that's fatal. The one deviation from the teacher is
//! the file format: `.algebras.config` is YAML, not JSON, because the
//! upstream tool it reimplements uses YAML.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::locale::{LocaleEntry, LocaleMap};

pub const CONFIG_FILE_NAME: &str = ".algebras.config";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiConfig {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub glossary_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_normalize_strings")]
    pub normalize_strings: bool,
}

fn default_normalize_strings() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            glossary_id: None,
            prompt: None,
            normalize_strings: default_normalize_strings(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct XlfConfig {
    #[serde(default = "default_target_state")]
    pub default_target_state: String,
}

fn default_target_state() -> String {
    "translated".to_string()
}

impl Default for XlfConfig {
    fn default() -> Self {
        Self {
            default_target_state: default_target_state(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PoConfig {
    #[serde(default)]
    pub mark_fuzzy: bool,
}

/// `source_files` entry: a destination pattern containing the
/// `%algebras_locale_code%` token.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceFileBinding {
    pub destination_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub languages: Vec<LocaleEntry>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub source_files: HashMap<String, SourceFileBinding>,
    /// Deprecated fallback; a deprecation warning is emitted at load time
    /// when this is non-empty (Open Question 4: `source_files` wins when
    /// both are present).
    #[serde(default)]
    pub path_rules: Vec<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_parallel_batches")]
    pub max_parallel_batches: usize,
    #[serde(default)]
    pub xlf: XlfConfig,
    #[serde(default)]
    pub po: PoConfig,
    /// Reserved for the out-of-scope string extractor; round-tripped but
    /// never interpreted by the core.
    #[serde(default)]
    pub parse: serde_yaml::Value,
}

fn default_batch_size() -> usize {
    20
}

fn default_max_parallel_batches() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: vec![LocaleEntry::Bare("en".to_string())],
            source_language: None,
            source_files: HashMap::new(),
            path_rules: Vec::new(),
            api: ApiConfig::default(),
            batch_size: default_batch_size(),
            max_parallel_batches: default_max_parallel_batches(),
            xlf: XlfConfig::default(),
            po: PoConfig::default(),
            parse: serde_yaml::Value::Null,
        }
    }
}

impl Config {
    /// Validate glob patterns in `path_rules`. An invalid pattern anywhere
    /// in `source_files` destination templates is not a glob and is not
    /// validated here.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.path_rules {
            let bare = pattern.strip_prefix('!').unwrap_or(pattern);
            Pattern::new(bare)
                .with_context(|| format!("Invalid glob pattern in 'path_rules': \"{}\"", pattern))?;
        }

        if self.batch_size == 0 {
            bail!("'batch_size' must be at least 1");
        }
        if self.max_parallel_batches == 0 {
            bail!("'max_parallel_batches' must be at least 1");
        }

        Ok(())
    }

    /// The source locale: explicit `source_language`, else the first
    /// configured language, else `"en"`.
    pub fn source_language(&self) -> String {
        self.source_language.clone().unwrap_or_else(|| {
            self.languages
                .first()
                .map(|l| l.internal().to_string())
                .unwrap_or_else(|| "en".to_string())
        })
    }

    /// Target locales: every configured language other than the source.
    pub fn target_languages(&self) -> Vec<&LocaleEntry> {
        let source = self.source_language();
        self.languages
            .iter()
            .filter(|l| l.internal() != source)
            .collect()
    }

    pub fn locale_map(&self) -> LocaleMap {
        LocaleMap::build(&self.languages)
    }

    /// Apply the two numeric env-var overrides, only when the config omits
    /// them explicitly (the file always wins over the environment).
    pub fn apply_env_overrides(&mut self, explicit_batch_size: bool, explicit_max_parallel: bool) {
        if !explicit_batch_size
            && let Ok(value) = env::var("ALGEBRAS_BATCH_SIZE")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed >= 1
        {
            self.batch_size = parsed;
        }
        if !explicit_max_parallel
            && let Ok(value) = env::var("ALGEBRAS_MAX_PARALLEL_BATCHES")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed >= 1
        {
            self.max_parallel_batches = parsed;
        }
    }

    /// Whether the deprecated `path_rules` key is present alongside (or
    /// instead of) `source_files`.
    pub fn deprecation_warning(&self) -> Option<&'static str> {
        if self.path_rules.is_empty() {
            None
        } else {
            Some(
                "'path_rules' is deprecated; prefer 'source_files' for explicit \
                 source-to-destination routing. 'source_files' takes precedence \
                 when both are configured.",
            )
        }
    }
}

pub fn default_config_yaml() -> Result<String> {
    let config = Config::default();
    serde_yaml::to_string(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    find_named_config_file(start_dir, CONFIG_FILE_NAME)
}

pub fn find_named_config_file(start_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(file_name);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path, file_name: Option<&str>) -> Result<ConfigLoadResult> {
    let found = match file_name {
        Some(name) => find_named_config_file(start_dir, name),
        None => find_config_file(start_dir),
    };

    match found {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let mut config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            config.apply_env_overrides(
                content.contains("batch_size"),
                content.contains("max_parallel_batches"),
            );
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => {
            let mut config = Config::default();
            config.apply_env_overrides(false, false);
            Ok(ConfigLoadResult {
                config,
                from_file: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn default_config_has_one_source_language() {
        let config = Config::default();
        assert_eq!(config.source_language(), "en");
        assert!(config.target_languages().is_empty());
    }

    #[test]
    fn parses_bare_and_mapped_languages() {
        let yaml = "languages:\n  - en\n  - fr\n  - uz_Cyrl: uz-Cyrl-UZ\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.languages.len(), 3);
        assert_eq!(config.source_language(), "en");
        let targets: Vec<&str> = config.target_languages().iter().map(|l| l.internal()).collect();
        assert_eq!(targets, vec!["fr", "uz_Cyrl"]);
    }

    #[test]
    fn explicit_source_language_overrides_first_entry() {
        let yaml = "languages:\n  - en\n  - fr\nsource_language: fr\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.source_language(), "fr");
        let targets: Vec<&str> = config.target_languages().iter().map(|l| l.internal()).collect();
        assert_eq!(targets, vec!["en"]);
    }

    #[test]
    fn find_config_file_walks_up_to_file() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("src").join("components");
        fs::create_dir_all(&sub_dir).unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        File::create(&config_path).unwrap();

        let found = find_config_file(&sub_dir);
        assert_eq!(found.unwrap(), config_path);
    }

    #[test]
    fn find_config_file_stops_at_git_boundary() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        assert!(find_config_file(dir.path()).is_none());
    }

    #[test]
    fn load_config_defaults_when_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let result = load_config(dir.path(), None).unwrap();
        assert!(!result.from_file);
        assert_eq!(result.config.batch_size, 20);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "languages:\n  - en\n  - fr\nbatch_size: 10\n").unwrap();

        let result = load_config(dir.path(), None).unwrap();
        assert!(result.from_file);
        assert_eq!(result.config.batch_size, 10);
    }

    #[test]
    fn validate_rejects_invalid_glob() {
        let config = Config {
            path_rules: vec!["[invalid".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_negated_glob() {
        let config = Config {
            path_rules: vec!["!**/node_modules/**".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deprecation_warning_only_when_path_rules_present() {
        assert!(Config::default().deprecation_warning().is_none());
        let config = Config {
            path_rules: vec!["**/*.json".to_string()],
            ..Config::default()
        };
        assert!(config.deprecation_warning().is_some());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
