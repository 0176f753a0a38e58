/*!
 * Chunk translation state machine.
 *
 * One chunk goes through translate, verify, then retry, bisect or accept.
 * Whatever happens, a successful return holds exactly one string per segment
 * of the chunk, in order. Only two conditions escape as errors: a rejected
 * credential and a quota that stayed exhausted on the last credential.
 *
 * - Quota on a credential with a successor: rotate, announce the pause and
 *   the resume, retry at once with a fresh attempt budget. Halves racing on
 *   the same throttled credential rotate and announce once.
 * - Quota on the last credential: exponential backoff, then `QuotaExhausted`.
 * - Short answer for several segments: bisect and translate both halves
 *   concurrently, each half running this same machine.
 * - Single segment: retry in place with a longer budget, blank answers
 *   included, and keep the source text if nothing usable comes back.
 * - Anything else: backoff and retry, then keep the source texts.
 */

use std::sync::Arc;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, error, warn};
use thiserror::Error;

use crate::app_config::RetryConfig;
use super::batch::{Chunk, restore_delimiter};
use super::client::{TranslationClient, TranslationOutcome};
use super::credentials::{CredentialPool, Rotation};
use super::progress::{ProgressEvent, ProgressKind, ProgressReporter};
use super::stats::SharedStats;

/// Failures that leave the chunk translator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkError {
    /// A credential was rejected; the run must stop
    #[error("Authentication failed for credential #{credential}: {message}")]
    Auth { credential: usize, message: String },

    /// The last credential stayed throttled through every retry
    #[error("Quota exhausted: {message}")]
    QuotaExhausted { message: String },
}

/// Where a chunk sits in the run, for event reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkScope {
    /// 1-based number of the top level chunk
    pub chunk_number: usize,
    pub total_chunks: usize,
    /// Segments finished before this chunk
    pub translated: usize,
    pub total_segments: usize,
    /// Bisection depth, 0 for a top level chunk
    pub depth: usize,
}

impl ChunkScope {
    pub fn top_level(chunk_number: usize, total_chunks: usize, translated: usize, total_segments: usize) -> Self {
        Self { chunk_number, total_chunks, translated, total_segments, depth: 0 }
    }

    fn child(self) -> Self {
        Self { depth: self.depth + 1, ..self }
    }

    pub(crate) fn event(&self, kind: ProgressKind, message: impl Into<String>) -> ProgressEvent {
        ProgressEvent::new(kind, self.translated, self.total_segments, message)
            .with_chunk(self.chunk_number, self.total_chunks)
    }
}

/// Drives chunks through the retry and bisection policy
#[derive(Debug, Clone)]
pub struct ChunkTranslator {
    client: TranslationClient,
    credentials: Arc<CredentialPool>,
    retry: RetryConfig,
    reporter: ProgressReporter,
    stats: SharedStats,
}

impl ChunkTranslator {
    pub fn new(
        client: TranslationClient,
        credentials: Arc<CredentialPool>,
        retry: RetryConfig,
        reporter: ProgressReporter,
        stats: SharedStats,
    ) -> Self {
        Self { client, credentials, retry, reporter, stats }
    }

    /// Translate one chunk; the result has exactly `chunk.len()` entries.
    ///
    /// A single-segment chunk cannot be bisected, so it retries in place with
    /// the larger `single_segment_attempts` budget and treats a blank answer
    /// as a failed attempt.
    pub fn translate_chunk<'a>(&'a self, chunk: &'a Chunk, scope: ChunkScope) -> BoxFuture<'a, Result<Vec<String>, ChunkError>> {
        async move {
            let delimiter = self.client.delimiter();
            let batch_text = chunk.joined_text(delimiter);
            let single = chunk.is_single();
            let budget = if single { self.retry.single_segment_attempts } else { self.retry.max_attempts }.max(1);
            let mut attempt: u32 = 0;

            loop {
                let (credential_index, credential) = self.credentials.current();
                debug!(
                    "Chunk {}/{} depth {}: {} segments, attempt {}/{} with credential #{}",
                    scope.chunk_number, scope.total_chunks, scope.depth, chunk.len(),
                    attempt + 1, budget, credential_index + 1
                );

                let failure = match self.client.translate(credential, &batch_text, chunk.len()).await {
                    TranslationOutcome::Success(text) => {
                        let units = self.split_response(chunk, &text);
                        if single && units[0].trim().is_empty() {
                            "Empty translation for single segment".to_string()
                        } else {
                            return Ok(self.normalize(chunk, units));
                        }
                    }
                    TranslationOutcome::AuthFailure(message) => {
                        error!("Credential #{} was rejected: {}", credential_index + 1, message);
                        return Err(ChunkError::Auth { credential: credential_index + 1, message });
                    }
                    TranslationOutcome::NeedsSplit { expected, received } => match chunk.bisect() {
                        Some(halves) => return self.bisect(chunk, halves, scope, expected, received).await,
                        None => format!("Short response: {} of {} units", received, expected),
                    },
                    TranslationOutcome::QuotaExceeded(message) => {
                        let rotation = self.credentials.rotate_from(credential_index);
                        if let Rotation::Advanced { to } = rotation {
                            self.announce_rotation(scope, credential_index, to);
                        }
                        if rotation.has_next() {
                            attempt = 0;
                            continue;
                        }
                        if attempt + 1 < budget {
                            let delay = self.retry.backoff_delay(attempt);
                            warn!(
                                "Quota hit on last credential #{}, retrying chunk {} in {:?}",
                                credential_index + 1, scope.chunk_number, delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        warn!("Quota still exhausted after {} attempts on chunk {}", budget, scope.chunk_number);
                        return Err(ChunkError::QuotaExhausted { message });
                    }
                    TranslationOutcome::TransientFailure(message) => message,
                };

                if attempt + 1 < budget {
                    let delay = self.retry.backoff_delay(attempt);
                    debug!("Attempt {} failed ({}), retrying in {:?}", attempt + 1, failure, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                warn!(
                    "Giving up on segments {}-{} after {} attempts ({}), keeping source text",
                    chunk.first_index(), chunk.last_index(), budget, failure
                );
                self.stats.lock().fallback_segments += chunk.len();
                return Ok(chunk.original_texts());
            }
        }.boxed()
    }

    async fn bisect(
        &self,
        chunk: &Chunk,
        (first, second): (Chunk, Chunk),
        scope: ChunkScope,
        expected: usize,
        received: usize,
    ) -> Result<Vec<String>, ChunkError> {
        self.stats.lock().bisections += 1;
        debug!(
            "Truncated answer ({} of {} units) for segments {}-{}, splitting at depth {} into {} + {}",
            received, expected, chunk.first_index(), chunk.last_index(), scope.depth, first.len(), second.len()
        );
        if scope.depth == 0 {
            self.reporter.emit(scope.event(
                ProgressKind::Progress,
                format!(
                    "Chunk {} too large, splitting into smaller parts ({} → {} + {} subtitles)...",
                    scope.chunk_number, chunk.len(), first.len(), second.len()
                ),
            ));
        }

        let child = scope.child();
        let (mut left, right) = futures::try_join!(
            self.translate_chunk(&first, child),
            self.translate_chunk(&second, child),
        )?;
        left.extend(right);

        Ok(self.normalize(chunk, left))
    }

    /// Only the caller whose rotation moved the cursor announces it
    fn announce_rotation(&self, scope: ChunkScope, exhausted: usize, active: usize) {
        self.stats.lock().rotations += 1;
        let next = active + 1;
        self.reporter.emit(
            scope.event(
                ProgressKind::QuotaError,
                format!(
                    "API quota limit reached on credential #{}! Translation paused, switching to credential #{}...",
                    exhausted + 1, next
                ),
            ).with_retry_after(0),
        );
        self.reporter.emit(scope.event(
            ProgressKind::Retry,
            format!("Resuming translation of chunk {} with credential #{}...", scope.chunk_number, next),
        ));
    }

    fn split_response(&self, chunk: &Chunk, text: &str) -> Vec<String> {
        let delimiter = self.client.delimiter();
        if chunk.is_single() {
            return vec![restore_delimiter(text.trim(), delimiter)];
        }
        text.split(delimiter)
            .map(|unit| restore_delimiter(unit.trim(), delimiter))
            .collect()
    }

    /// Force one entry per segment: drop extras, pad with source text, and
    /// replace blank entries with the source text
    fn normalize(&self, chunk: &Chunk, mut units: Vec<String>) -> Vec<String> {
        let expected = chunk.len();
        if units.len() > expected {
            warn!(
                "Dropping {} surplus unit(s) for segments {}-{}",
                units.len() - expected, chunk.first_index(), chunk.last_index()
            );
            units.truncate(expected);
        }

        let mut fallbacks = 0;
        if units.len() < expected {
            warn!(
                "Missing {} unit(s) for segments {}-{}, keeping source text",
                expected - units.len(), chunk.first_index(), chunk.last_index()
            );
            fallbacks += expected - units.len();
            units.extend(chunk.segments()[units.len()..].iter().map(|s| s.text.clone()));
        }

        for (unit, segment) in units.iter_mut().zip(chunk.segments()) {
            if unit.trim().is_empty() && !segment.text.trim().is_empty() {
                *unit = segment.text.clone();
                fallbacks += 1;
            }
        }

        if fallbacks > 0 {
            self.stats.lock().fallback_segments += fallbacks;
        }
        units
    }
}
