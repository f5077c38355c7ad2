use std::env;

use anyhow::Result;

use super::super::args::LocaleScopedArgs;
use super::super::exit_status::ExitStatus;
use super::super::report;
use super::helper::{load_config_for, require_target_language, resolve_provider};
use crate::orchestrator::{Orchestrator, RunKind};

/// Read-only check: exits non-zero if any target locale has missing or
/// outdated keys, without writing anything. Intended for CI pipelines
/// guarding against translations drifting out of sync with the source.
pub fn ci(args: LocaleScopedArgs) -> Result<ExitStatus> {
    let config = load_config_for(&args.common)?;
    require_target_language(&config, args.language.as_deref())?;

    let provider = resolve_provider();
    let root = env::current_dir()?;
    let orchestrator = Orchestrator::new(root, config, &provider);
    let summary = orchestrator.ci(args.language.as_deref())?;

    report::report(RunKind::Ci, &summary);

    if !summary.errors.is_empty() {
        return Ok(ExitStatus::Error);
    }
    Ok(if summary.total_translated() > 0 { ExitStatus::Failure } else { ExitStatus::Success })
}
