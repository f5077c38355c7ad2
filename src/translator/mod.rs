//! Translator Driver: batches flat keys to a provider, with adaptive
//! split on payload-too-large and bounded-parallel worker pools.
//!
//! Grounded on `translate_command.py`/`update_command.py`'s batching
//! loop: strings are grouped into `batch_size`-sized chunks, up to
//! `max_parallel_batches` chunks are in flight at once via a `rayon`
//! thread pool (the teacher's own worker-pool idiom), and a batch that
//! the provider rejects as too large is split in half and retried rather
//! than failing the whole run.

pub mod provider;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;

use crate::error::AlgebrasError;

pub use provider::{TranslationProvider, TranslationRequest};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 200;

/// One (key, source_text) pair awaiting translation.
#[derive(Debug, Clone)]
pub struct PendingString {
    pub key: String,
    pub source_text: String,
}

#[derive(Debug, Clone)]
pub struct TranslatedString {
    pub key: String,
    pub translated_text: String,
}

/// Result of one `translate_batch` call: the strings that came back
/// successfully, plus the keys that were dropped rather than aborting the
/// whole job (currently only a single-element batch still rejected as
/// too-large by the provider).
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub translated: Vec<TranslatedString>,
    pub failed_keys: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct ChunkOutcome {
    translated: Vec<TranslatedString>,
    failed_keys: Vec<String>,
}

pub struct TranslatorDriver<'a> {
    provider: &'a dyn TranslationProvider,
    batch_size: usize,
    max_parallel_batches: usize,
    cancelled: Arc<AtomicBool>,
    ui_safe: bool,
    glossary_id: Option<String>,
    prompt: Option<String>,
}

impl<'a> TranslatorDriver<'a> {
    pub fn new(provider: &'a dyn TranslationProvider, batch_size: usize, max_parallel_batches: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            max_parallel_batches: max_parallel_batches.max(1),
            cancelled: Arc::new(AtomicBool::new(false)),
            ui_safe: false,
            glossary_id: None,
            prompt: None,
        }
    }

    /// Attach the per-job options a `translate` invocation can override
    /// (`--ui-safe`, `--glossary-id`, `--prompt-file`); every batch this
    /// driver sends carries them on the `TranslationRequest`.
    pub fn with_job_options(mut self, ui_safe: bool, glossary_id: Option<String>, prompt: Option<String>) -> Self {
        self.ui_safe = ui_safe;
        self.glossary_id = glossary_id;
        self.prompt = prompt;
        self
    }

    /// Signal every in-flight and not-yet-started batch to stop. Already
    /// running provider calls still complete; no new ones are dispatched.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Translate every pending string into `target_locale`, preserving
    /// input order in the result. Batches run with up to
    /// `max_parallel_batches` concurrent provider calls via a scoped
    /// `rayon` thread pool sized to that bound.
    pub fn translate_batch(&self, strings: &[PendingString], target_locale: &str) -> Result<BatchResult> {
        if strings.is_empty() {
            return Ok(BatchResult::default());
        }

        let chunks: Vec<&[PendingString]> = strings.chunks(self.batch_size).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel_batches)
            .build()
            .map_err(|e| AlgebrasError::Config(format!("failed to build translator thread pool: {e}")))?;

        let results: Vec<Result<ChunkOutcome>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| self.translate_chunk_with_retry(chunk, target_locale))
                .collect()
        });

        let mut out = BatchResult::default();
        for result in results {
            let outcome = result?;
            out.translated.extend(outcome.translated);
            out.failed_keys.extend(outcome.failed_keys);
        }
        Ok(out)
    }

    /// Only the keys the Diff Engine flagged as missing.
    pub fn translate_missing_keys_batch(&self, strings: &[PendingString], target_locale: &str) -> Result<BatchResult> {
        self.translate_batch(strings, target_locale)
    }

    /// Only the keys the Diff Engine flagged as outdated.
    pub fn translate_outdated_keys_batch(&self, strings: &[PendingString], target_locale: &str) -> Result<BatchResult> {
        self.translate_batch(strings, target_locale)
    }

    fn translate_chunk_with_retry(&self, chunk: &[PendingString], target_locale: &str) -> Result<ChunkOutcome> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Ok(ChunkOutcome::default());
        }

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 0..MAX_RETRIES {
            match self.call_provider(chunk, target_locale) {
                Ok(translated) => return Ok(ChunkOutcome { translated, failed_keys: Vec::new() }),
                Err(AlgebrasError::ProviderPayloadTooLarge) => {
                    return self.split_and_retry(chunk, target_locale);
                }
                Err(AlgebrasError::ProviderTransient(_)) if attempt + 1 < MAX_RETRIES => {
                    std::thread::sleep(std::time::Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(other) => return Err(other.into()),
            }
        }
        unreachable!("loop always returns on its final iteration")
    }

    /// Halve the batch and translate each half independently. A
    /// single-item batch that still fails too-large is recorded as failed
    /// and skipped rather than aborting the rest of the job.
    fn split_and_retry(&self, chunk: &[PendingString], target_locale: &str) -> Result<ChunkOutcome> {
        if chunk.len() <= 1 {
            if let Some(pending) = chunk.first() {
                log::warn!("dropping key \"{}\": payload too large even alone", pending.key);
            }
            return Ok(ChunkOutcome {
                translated: Vec::new(),
                failed_keys: chunk.iter().map(|p| p.key.clone()).collect(),
            });
        }
        let mid = chunk.len() / 2;
        let mut first = self.translate_chunk_with_retry(&chunk[..mid], target_locale)?;
        let second = self.translate_chunk_with_retry(&chunk[mid..], target_locale)?;
        first.translated.extend(second.translated);
        first.failed_keys.extend(second.failed_keys);
        Ok(first)
    }

    fn call_provider(&self, chunk: &[PendingString], target_locale: &str) -> Result<Vec<TranslatedString>, AlgebrasError> {
        let request = TranslationRequest {
            texts: chunk.iter().map(|s| s.source_text.clone()).collect(),
            target_locale: target_locale.to_string(),
            ui_safe: self.ui_safe,
            glossary_id: self.glossary_id.clone(),
            prompt: self.prompt.clone(),
        };
        let translated = self.provider.translate(&request)?;
        Ok(chunk
            .iter()
            .zip(translated)
            .map(|(pending, text)| TranslatedString {
                key: pending.key.clone(),
                translated_text: text,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct EchoProvider {
        calls: AtomicUsize,
    }

    impl TranslationProvider for EchoProvider {
        fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(request
                .texts
                .iter()
                .map(|t| format!("[{}] {t}", request.target_locale))
                .collect())
        }
    }

    #[test]
    fn translates_all_strings_preserving_order() {
        let provider = EchoProvider { calls: AtomicUsize::new(0) };
        let driver = TranslatorDriver::new(&provider, 2, 2);
        let strings = vec![
            PendingString { key: "a".to_string(), source_text: "Hello".to_string() },
            PendingString { key: "b".to_string(), source_text: "World".to_string() },
            PendingString { key: "c".to_string(), source_text: "Foo".to_string() },
        ];

        let result = driver.translate_batch(&strings, "fr").unwrap();
        assert_eq!(result.translated.len(), 3);
        assert!(result.failed_keys.is_empty());
        assert_eq!(result.translated[0].key, "a");
        assert_eq!(result.translated[0].translated_text, "[fr] Hello");
        assert_eq!(result.translated[2].translated_text, "[fr] Foo");
    }

    struct TooLargeThenOkProvider;

    impl TranslationProvider for TooLargeThenOkProvider {
        fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError> {
            if request.texts.len() > 1 {
                return Err(AlgebrasError::ProviderPayloadTooLarge);
            }
            Ok(request.texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    #[test]
    fn adaptive_split_recovers_from_payload_too_large() {
        let driver = TranslatorDriver::new(&TooLargeThenOkProvider, 10, 1);
        let strings = vec![
            PendingString { key: "a".to_string(), source_text: "hi".to_string() },
            PendingString { key: "b".to_string(), source_text: "bye".to_string() },
        ];
        let result = driver.translate_batch(&strings, "fr").unwrap();
        assert_eq!(result.translated.len(), 2);
        assert!(result.failed_keys.is_empty());
        assert_eq!(result.translated[0].translated_text, "HI");
        assert_eq!(result.translated[1].translated_text, "BYE");
    }

    struct AlwaysTooLargeProvider;

    impl TranslationProvider for AlwaysTooLargeProvider {
        fn translate(&self, _request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError> {
            Err(AlgebrasError::ProviderPayloadTooLarge)
        }
    }

    #[test]
    fn single_element_batch_still_too_large_is_skipped_not_aborted() {
        let driver = TranslatorDriver::new(&AlwaysTooLargeProvider, 10, 1);
        let strings = vec![
            PendingString { key: "a".to_string(), source_text: "hi".to_string() },
            PendingString { key: "huge".to_string(), source_text: "x".repeat(10_000) },
        ];
        let result = driver.translate_batch(&strings, "fr").unwrap();
        assert!(result.translated.is_empty());
        assert_eq!(result.failed_keys, vec!["a".to_string(), "huge".to_string()]);
    }

    struct AlwaysTransientProvider;

    impl TranslationProvider for AlwaysTransientProvider {
        fn translate(&self, _request: &TranslationRequest) -> Result<Vec<String>, AlgebrasError> {
            Err(AlgebrasError::ProviderTransient("rate limited".to_string()))
        }
    }

    #[test]
    fn transient_errors_exhaust_retries_and_surface() {
        let driver = TranslatorDriver::new(&AlwaysTransientProvider, 10, 1);
        let strings = vec![PendingString { key: "a".to_string(), source_text: "hi".to_string() }];
        let result = driver.translate_batch(&strings, "fr");
        assert!(result.is_err());
    }
}
