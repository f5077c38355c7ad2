//! Error taxonomy for the translation synchronization engine.
//!
//! Most call sites propagate `anyhow::Error` with `.context(...)` the way the
//! teacher's `config` module does for file I/O. `AlgebrasError` exists only at
//! the boundaries that need to branch on *kind* — the Translator Driver
//! distinguishing transient/payload-too-large/permanent failures, and the
//! Orchestrator distinguishing file-scoped from process-scoped ones.

use thiserror::Error;

/// Kinds of failure the engine can produce, beyond plain I/O errors.
#[derive(Debug, Error)]
pub enum AlgebrasError {
    /// Malformed or missing configuration. Fatal: aborts the run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A resource file could not be parsed. Non-fatal: skips that file pair.
    #[error("failed to read {path} as {format}: {reason}")]
    Format {
        path: String,
        format: &'static str,
        reason: String,
    },

    /// Transport or rate-limit failure; the driver retries with backoff.
    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    /// The provider rejected a batch as too large to translate in one call.
    /// Triggers adaptive split; never surfaced unless a single-item batch
    /// still fails.
    #[error("payload too large for provider")]
    ProviderPayloadTooLarge,

    /// Authentication or bad-request failure. Surfaced immediately, aborts
    /// the current job.
    #[error("permanent provider error: {0}")]
    ProviderPermanent(String),

    /// git is not installed, or the file is not inside a git work tree.
    /// Degrades git-based checks to a no-op for that path.
    #[error("git unavailable: {0}")]
    GitUnavailable(String),
}

impl AlgebrasError {
    /// Whether this error should abort the whole run rather than just the
    /// current file or job.
    pub fn is_process_fatal(&self) -> bool {
        matches!(self, AlgebrasError::Config(_))
    }
}
