//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `init`: write a starter `.algebras.config`
//! - `translate`: write every target-locale file from scratch
//! - `update`: translate only missing/outdated keys against existing files
//! - `ci`: same diff as `update` but read-only, fails the build on drift
//! - `status`: report per-locale completion percentage

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Translate(cmd)) => cmd.locale.common.verbose,
            Some(Command::Update(cmd)) => cmd.common.verbose,
            Some(Command::Ci(cmd)) => cmd.common.verbose,
            Some(Command::Status(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by every command that touches the config file.
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Path to the config file (overrides the usual upward search)
    #[arg(short = 'f', long = "config-file")]
    pub config_file: Option<std::path::PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct LocaleScopedArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Restrict the run to a single target locale
    #[arg(long = "language")]
    pub language: Option<String>,
}

/// Arguments for `translate`, which -- unlike `update`/`ci`/`status` -- can
/// force a full rewrite, narrow itself to missing keys only, and tune the
/// job handed to the translation provider.
#[derive(Debug, Parser)]
pub struct TranslateArgs {
    #[command(flatten)]
    pub locale: LocaleScopedArgs,

    /// Translate every key even if the target file already exists
    #[arg(long)]
    pub force: bool,

    /// Translate only keys missing from the target file, skipping the
    /// outdated-by-git/mtime check
    #[arg(long = "only-missing")]
    pub only_missing: bool,

    /// Ask the provider to keep translated strings no longer than the source
    #[arg(long = "ui-safe")]
    pub ui_safe: bool,

    /// Override the configured translator batch size for this run
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// Override the configured translator concurrency for this run
    #[arg(long = "max-parallel-batches")]
    pub max_parallel_batches: Option<usize>,

    /// Override the configured glossary for this run
    #[arg(long = "glossary-id")]
    pub glossary_id: Option<String>,

    /// Path to a file with a custom instruction prompt for the provider
    #[arg(long = "prompt-file")]
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a starter .algebras.config in the current directory
    Init,
    /// Translate every configured target locale from the source files
    Translate(TranslateArgs),
    /// Translate only missing or outdated keys
    Update(LocaleScopedArgs),
    /// Fail if any target locale has missing or outdated keys
    Ci(LocaleScopedArgs),
    /// Report per-locale translation completion
    Status(LocaleScopedArgs),
}
