use std::env;

use anyhow::Result;

use super::super::args::LocaleScopedArgs;
use super::super::exit_status::ExitStatus;
use super::super::report;
use super::helper::{load_config_for, require_target_language, resolve_provider};
use crate::orchestrator::{Orchestrator, RunKind};

pub fn status(args: LocaleScopedArgs) -> Result<ExitStatus> {
    let config = load_config_for(&args.common)?;
    require_target_language(&config, args.language.as_deref())?;

    let provider = resolve_provider();
    let root = env::current_dir()?;
    let orchestrator = Orchestrator::new(root, config, &provider);
    let summary = orchestrator.status(args.language.as_deref())?;

    report::report(RunKind::Status, &summary);

    Ok(if summary.errors.is_empty() { ExitStatus::Success } else { ExitStatus::Failure })
}
