//! The `TranslationProvider` seam: the engine depends only on this trait,
//! never on a concrete translation backend.
//!
//! Grounded on the abstract `translate_batch(strings, target_locale,
//! options)` capability the driver layer builds on. No example repo in
//! this corpus carries an HTTP client dependency, so a concrete
//! network-backed implementation is left unwritten rather than bolting on
//! an unverified one; [`IdentityProvider`] is the one concrete
//! implementation shipped here, used for dry runs and tests.

use crate::error::AlgebrasError;

#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    pub texts: Vec<String>,
    pub target_locale: String,
    /// Ask the provider to keep translations no longer than their source.
    pub ui_safe: bool,
    /// Glossary to consult, overriding `api.glossary_id` for this job.
    pub glossary_id: Option<String>,
    /// Custom instruction prompt, read from `--prompt-file`.
    pub prompt: Option<String>,
}

/// A backend capable of translating a batch of strings into one target
/// locale. Implementations classify failures into the three kinds the
/// driver branches on: transient (retry), payload-too-large (split), or
/// permanent (abort the batch).
pub trait TranslationProvider: Send + Sync {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError>;
}

/// Returns each input string unchanged. Used when no API key is
/// configured (dry runs, `algebras status`, tests) so the rest of the
/// pipeline can still be exercised end to end.
pub struct IdentityProvider;

impl TranslationProvider for IdentityProvider {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError> {
        Ok(request.texts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_provider_echoes_input() {
        let request = TranslationRequest {
            texts: vec!["Hello".to_string(), "World".to_string()],
            target_locale: "fr".to_string(),
            ..Default::default()
        };
        let result = IdentityProvider.translate(&request).unwrap();
        assert_eq!(result, vec!["Hello".to_string(), "World".to_string()]);
    }
}
