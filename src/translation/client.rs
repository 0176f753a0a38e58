/*!
 * Single request translation with failure classification.
 *
 * The client sends one delimited batch with one credential and turns the
 * result into a `TranslationOutcome`. It never retries; retry, rotation and
 * bisection decisions belong to the chunk translator.
 */

use std::sync::Arc;
use std::time::Instant;
use log::debug;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};
use super::credentials::Credential;
use super::stats::SharedStats;

// @const: Message fragments that identify a rejected credential
const AUTH_MARKERS: &[&str] = &[
    "authentication failed",
    "unauthenticated",
    "invalid api key",
    "invalid key",
    "api key not valid",
    "api_key_invalid",
    "unauthorized",
    "forbidden",
    "permission_denied",
];

// @const: Message fragments that identify a quota or rate limit
const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "rate_limit_exceeded",
    "resource_exhausted",
    "too many requests",
    "requests per minute",
    "rpm",
    "429",
];

/// Result of one translation request
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome {
    /// Raw response text
    Success(String),
    /// The response held fewer units than the request
    NeedsSplit { expected: usize, received: usize },
    /// The credential is throttled
    QuotaExceeded(String),
    /// The credential was rejected
    AuthFailure(String),
    /// Anything else, worth retrying
    TransientFailure(String),
}

/// Prompt settings of a run
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Target language as shown to the model
    pub target_language: String,
    /// Optional hint about the show or movie
    pub context: Option<String>,
    /// Unit separator
    pub delimiter: char,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// Builds prompts, calls the backend and classifies the answer
#[derive(Debug, Clone)]
pub struct TranslationClient {
    provider: Arc<dyn Provider>,
    system_prompt: String,
    instruction: String,
    delimiter: char,
    temperature: Option<f32>,
    stats: SharedStats,
}

impl TranslationClient {
    pub fn new(provider: Arc<dyn Provider>, options: ClientOptions, stats: SharedStats) -> Self {
        Self {
            system_prompt: Self::build_system_prompt(&options.target_language, options.delimiter, options.context.as_deref()),
            instruction: format!("Translate these subtitles into {}:", options.target_language),
            delimiter: options.delimiter,
            temperature: options.temperature,
            provider,
            stats,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// System instruction sent with every request
    pub fn build_system_prompt(target_language: &str, delimiter: char, context: Option<&str>) -> String {
        let mut prompt = format!(
            "You are a professional subtitle translator for movies and TV series, translating into {language}. \
             IMPORTANT: Carefully preserve all original formatting, including HTML tags such as <i> for italics. \
             Separate the translated segments with the '{delimiter}' symbol, exactly one per input segment. \
             Keep the style and tone of the original language. \
             Do not translate proper nouns. Keep show names such as 'The Amazing Race' unchanged. \
             CRITICAL: Preserve EXACTLY the line break structure of the original text. \
             When dialogue lines start with hyphens on separate lines (like '-Line one\\n-Line two'), \
             keep each line on its own line with a line break (\\n). \
             NEVER merge multiple dialogue lines into a single line.",
            language = target_language,
            delimiter = delimiter,
        );

        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            prompt.push_str("\n\nCONTEXT: ");
            prompt.push_str(context);
        }

        prompt
    }

    /// Send one batch and classify the answer.
    ///
    /// `original_units` is the number of segments behind `batch_text`; a short
    /// answer only asks for a split when there is more than one.
    pub async fn translate(&self, credential: &Credential, batch_text: &str, original_units: usize) -> TranslationOutcome {
        let request = CompletionRequest {
            system: self.system_prompt.clone(),
            instruction: self.instruction.clone(),
            payload: batch_text.to_string(),
            temperature: self.temperature,
        };

        let started = Instant::now();
        let result = self.provider.complete(credential, &request).await;
        {
            let mut stats = self.stats.lock();
            stats.requests += 1;
            stats.api_duration += started.elapsed();
            if let Ok(response) = &result {
                stats.add_token_usage(response.prompt_tokens, response.completion_tokens);
            }
        }

        let response = match result {
            Ok(response) => response,
            Err(error) => return Self::classify_error(&error),
        };

        let expected = batch_text.split(self.delimiter).count();
        let received = response.text.split(self.delimiter).count();
        if received < expected {
            debug!(
                "Short response from {}: {} of {} units (finish reason {:?})",
                self.provider.name(), received, expected, response.finish_reason
            );
            if original_units > 1 {
                return TranslationOutcome::NeedsSplit { expected, received };
            }
            return TranslationOutcome::TransientFailure(format!(
                "Response held {} of {} units", received, expected
            ));
        }

        TranslationOutcome::Success(response.text)
    }

    /// Map a provider error to an outcome.
    ///
    /// Typed signals decide first: an authentication error or a 401/403 is an
    /// auth failure, a rate limit error or a 429 is a quota failure. Only
    /// untyped errors are matched against the message vocabulary, auth
    /// phrases before quota phrases.
    pub fn classify_error(error: &ProviderError) -> TranslationOutcome {
        let message = error.to_string();
        match error {
            ProviderError::AuthenticationError(_) => return TranslationOutcome::AuthFailure(message),
            ProviderError::RateLimitExceeded { .. } => return TranslationOutcome::QuotaExceeded(message),
            _ => {}
        }
        match error.status_code() {
            Some(401) | Some(403) => return TranslationOutcome::AuthFailure(message),
            Some(429) => return TranslationOutcome::QuotaExceeded(message),
            _ => {}
        }

        let detail = Self::detail(error);
        if AUTH_MARKERS.iter().any(|marker| detail.contains(marker)) {
            return TranslationOutcome::AuthFailure(message);
        }
        if QUOTA_MARKERS.iter().any(|marker| detail.contains(marker)) {
            return TranslationOutcome::QuotaExceeded(message);
        }
        TranslationOutcome::TransientFailure(message)
    }

    fn detail(error: &ProviderError) -> String {
        match error {
            ProviderError::RequestFailed(m)
            | ProviderError::ParseError(m)
            | ProviderError::ConnectionError(m)
            | ProviderError::AuthenticationError(m) => m.to_lowercase(),
            ProviderError::ApiError { message, .. } => message.to_lowercase(),
            ProviderError::RateLimitExceeded { message, .. } => message.to_lowercase(),
        }
    }
}
