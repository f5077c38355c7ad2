//! algebras - keeps translated resource files synchronized with a
//! source-language file across many formats.
//!
//! Given a source-language resource file (JSON, YAML, Android XML, iOS
//! `.strings`/`.stringsdict`, gettext `.po`, XLIFF, HTML, CSV/TSV, or Java
//! `.properties`) and a set of configured target locales, the engine
//! discovers every target copy, diffs it against the source, translates
//! whatever is missing or outdated, and writes the result back -- in
//! place when the format supports it, regenerated wholesale otherwise.
//!
//! ## Module Structure
//!
//! - `cli`: command-line interface layer
//! - `config`: configuration file loading and parsing
//! - `diff`: missing/outdated key classification
//! - `error`: the engine's error taxonomy
//! - `git`: batched `git blame` lookups backing the outdated check
//! - `locale`: locale code mapping (internal vs. destination codes)
//! - `orchestrator`: wires scanning, diffing, translating and writing
//!   into the translate/update/ci/status flows
//! - `path_resolver`: source path to destination path for a target locale
//! - `registry`: per-format read/write/in-place handlers
//! - `resource_map`: the in-memory, order-preserving resource tree
//! - `scanner`: discovers localization files and groups them by locale
//! - `translator`: batches flat keys to a translation provider

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod locale;
pub mod orchestrator;
pub mod path_resolver;
pub mod registry;
pub mod resource_map;
pub mod scanner;
pub mod translator;
