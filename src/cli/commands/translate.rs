use std::env;
use std::fs;

use anyhow::{Context, Result};

use super::super::args::TranslateArgs;
use super::super::exit_status::ExitStatus;
use super::super::report;
use super::helper::{load_config_for, require_target_language, resolve_provider};
use crate::orchestrator::{Orchestrator, RunKind, TranslateOptions};

pub fn translate(args: TranslateArgs) -> Result<ExitStatus> {
    let locale = args.locale;
    let config = load_config_for(&locale.common)?;
    require_target_language(&config, locale.language.as_deref())?;

    let prompt = match &args.prompt_file {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?,
        ),
        None => None,
    };

    let options = TranslateOptions {
        force: args.force,
        only_missing: args.only_missing,
        ui_safe: args.ui_safe,
        batch_size: args.batch_size,
        max_parallel_batches: args.max_parallel_batches,
        glossary_id: args.glossary_id,
        prompt,
    };

    let provider = resolve_provider();
    let root = env::current_dir()?;
    let orchestrator = Orchestrator::new(root, config, &provider);
    let summary = orchestrator.translate(locale.language.as_deref(), &options)?;

    report::report(RunKind::Translate, &summary);

    Ok(if summary.errors.is_empty() { ExitStatus::Success } else { ExitStatus::Failure })
}
