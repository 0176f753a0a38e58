/*!
 * Run level orchestration.
 *
 * Chunks are translated strictly one after another; only the halves of a
 * bisected chunk run concurrently. When every credential is throttled the
 * whole run pauses for the cooldown window and resumes the same chunk.
 */

use std::sync::Arc;
use log::{error, info, warn};

use crate::app_config::{RetryConfig, TranslationConfig};
use crate::errors::TranslationError;
use crate::providers::Provider;
use super::batch::{Batcher, Segment};
use super::chunk::{ChunkError, ChunkScope, ChunkTranslator};
use super::client::{ClientOptions, TranslationClient};
use super::credentials::CredentialPool;
use super::progress::{ProgressEvent, ProgressKind, ProgressReporter};
use super::stats::{RunStats, shared_stats};

/// Translated texts of a finished run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One entry per input segment, same order
    pub translations: Vec<String>,
    pub stats: RunStats,
}

/// Translation pipeline for one backend
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    provider: Arc<dyn Provider>,
    batcher: Batcher,
    options: ClientOptions,
    retry: RetryConfig,
    min_key_length: usize,
}

impl TranslationPipeline {
    /// Build a pipeline from the translation settings
    ///
    /// `target_language` is the label shown to the model, `context` an
    /// optional hint about the show or movie.
    pub fn new(
        provider: Arc<dyn Provider>,
        config: &TranslationConfig,
        target_language: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        Self {
            provider,
            batcher: Batcher::new(config.max_tokens_per_chunk),
            options: ClientOptions {
                target_language: target_language.into(),
                context,
                delimiter: config.delimiter,
                temperature: Some(config.provider.temperature),
            },
            retry: config.retry.clone(),
            min_key_length: config.min_key_length,
        }
    }

    /// Replace the default heuristic batcher
    pub fn with_batcher(mut self, batcher: Batcher) -> Self {
        self.batcher = batcher;
        self
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    /// Translate `segments` with the comma separated `credentials`.
    ///
    /// Every outcome ends the event stream with exactly one `complete` or
    /// `error` event. On success the output is index aligned with the input.
    pub async fn run(
        &self,
        segments: &[Segment],
        credentials: &str,
        reporter: ProgressReporter,
    ) -> Result<PipelineOutput, TranslationError> {
        let total = segments.len();

        let pool = match CredentialPool::parse(credentials, self.min_key_length) {
            Ok(pool) => Arc::new(pool),
            Err(e) => return Err(Self::fail(&reporter, 0, total, e)),
        };
        if segments.is_empty() {
            let e = TranslationError::InvalidInput("No valid subtitle segments found".to_string());
            return Err(Self::fail(&reporter, 0, total, e));
        }

        let chunks = self.batcher.batch(segments);
        let total_chunks = chunks.len();
        let stats = shared_stats();
        let client = TranslationClient::new(Arc::clone(&self.provider), self.options.clone(), Arc::clone(&stats));
        let translator = ChunkTranslator::new(
            client,
            Arc::clone(&pool),
            self.retry.clone(),
            reporter.clone(),
            Arc::clone(&stats),
        );

        let mut start_message = format!("Starting translation of {} subtitles in {} chunks.", total, total_chunks);
        if let Some(context) = &self.options.context {
            start_message.push_str(&format!(" Context: {}", context));
        }
        info!("{} ({} credential(s), {} backend)", start_message, pool.len(), self.provider.name());
        reporter.emit(ProgressEvent::new(ProgressKind::Progress, 0, total, start_message).with_chunk(0, total_chunks));

        let mut translations: Vec<String> = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let number = i + 1;
            let mut cooldowns = 0;

            let units = loop {
                let scope = ChunkScope::top_level(number, total_chunks, translations.len(), total);
                match translator.translate_chunk(chunk, scope).await {
                    Ok(units) => break units,
                    Err(ChunkError::QuotaExhausted { message }) if cooldowns < self.retry.quota_cooldown_rounds => {
                        cooldowns += 1;
                        stats.lock().quota_pauses += 1;
                        let seconds = self.retry.quota_cooldown_secs;
                        warn!(
                            "All credentials throttled at chunk {}/{} ({}), pausing {}s",
                            number, total_chunks, message, seconds
                        );
                        reporter.emit(scope.event(
                            ProgressKind::QuotaError,
                            format!(
                                "API quota limit reached! Translation paused at chunk {}/{}. Waiting {}s for quota reset...",
                                number, total_chunks, seconds
                            ),
                        ).with_retry_after(seconds));

                        tokio::time::sleep(self.retry.quota_cooldown()).await;

                        reporter.emit(scope.event(
                            ProgressKind::Retry,
                            format!("Quota reset window passed! Resuming translation from chunk {}/{}...", number, total_chunks),
                        ));
                    }
                    Err(ChunkError::QuotaExhausted { .. }) => {
                        let e = TranslationError::QuotaExhausted { chunk: number };
                        return Err(Self::fail(&reporter, translations.len(), total, e));
                    }
                    Err(ChunkError::Auth { credential, message }) => {
                        let e = TranslationError::Authentication { credential, message };
                        return Err(Self::fail(&reporter, translations.len(), total, e));
                    }
                }
            };

            translations.extend(units);
            stats.lock().chunks += 1;
            reporter.emit(
                ProgressEvent::new(
                    ProgressKind::Progress,
                    translations.len(),
                    total,
                    format!("Chunk {}/{} completed ({}/{} subtitles)", number, total_chunks, translations.len(), total),
                ).with_chunk(number, total_chunks),
            );
        }

        enforce_length(&mut translations, segments);

        reporter.emit(
            ProgressEvent::new(ProgressKind::Complete, total, total, "Translation completed successfully!")
                .with_chunk(total_chunks, total_chunks),
        );

        let stats = stats.lock().clone();
        info!("{}", stats.summary());
        Ok(PipelineOutput { translations, stats })
    }

    fn fail(reporter: &ProgressReporter, translated: usize, total: usize, error: TranslationError) -> TranslationError {
        error!("Translation failed: {}", error);
        reporter.emit(ProgressEvent::new(ProgressKind::Error, translated, total, error.to_string()));
        error
    }
}

/// Pad with source texts or drop surplus entries so that the output lines up
/// with the input
pub fn enforce_length(translations: &mut Vec<String>, segments: &[Segment]) {
    if translations.len() == segments.len() {
        return;
    }
    error!(
        "CRITICAL ERROR: {} translations for {} segments, realigning",
        translations.len(), segments.len()
    );
    translations.truncate(segments.len());
    let missing = translations.len();
    translations.extend(segments[missing..].iter().map(|s| s.text.clone()));
}
