use std::env;

use anyhow::{Context, Result, bail};

use crate::config::{Config, load_config};
use crate::translator::provider::IdentityProvider;

use super::super::args::CommonArgs;

/// Load config from the usual search path (or an explicit override),
/// applying the `ALGEBRAS_API_KEY` env override and surfacing config
/// errors the way the teacher's check context does (a missing or
/// malformed config aborts the whole command rather than degrading).
pub fn load_config_for(common: &CommonArgs) -> Result<Config> {
    let start_dir = env::current_dir().context("Failed to determine current directory")?;
    let result = load_config(&start_dir, common.config_file.as_deref().and_then(|p| p.to_str()))?;
    result.config.validate()?;
    Ok(result.config)
}

/// The one built-in provider. A real network-backed provider is a
/// pluggable seam (see [`crate::translator::provider::TranslationProvider`])
/// left for deployments to supply; without `ALGEBRAS_API_KEY` set, runs
/// operate in pass-through mode so the rest of the pipeline is still
/// exercised.
pub fn resolve_provider() -> IdentityProvider {
    if env::var("ALGEBRAS_API_KEY").is_err() {
        log::warn!("ALGEBRAS_API_KEY is not set; running with a pass-through translation provider");
    }
    IdentityProvider
}

pub fn require_target_language(config: &Config, language: Option<&str>) -> Result<()> {
    if let Some(lang) = language {
        if !config.languages.iter().any(|l| l.internal() == lang) {
            bail!("'{lang}' is not a configured language");
        }
    }
    Ok(())
}
