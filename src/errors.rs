/*!
 * Error types for the resub application.
 *
 * Transport failures are reported as `ProviderError`, run level failures as
 * `TranslationError`, and the binary folds everything into `AppError`.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The credential hit a quota or rate limit
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Server suggested delay, when one was sent
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// HTTP status attached to the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimitExceeded { .. } => Some(429),
            _ => None,
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The content held no usable subtitle entry
    #[error("No valid subtitle entries were found")]
    NoEntries,

    /// A timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Translated texts do not line up with the source entries
    #[error("Entry count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of source entries
        expected: usize,
        /// Number of texts supplied
        actual: usize,
    },
}

/// Errors that end a translation run
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The run was rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A credential was rejected by the backend
    #[error("Authentication failed for credential #{credential}: {message}")]
    Authentication {
        /// Position of the rejected credential
        credential: usize,
        /// Error message from the backend
        message: String,
    },

    /// Every credential stayed throttled after the cooldown
    #[error("Quota exhausted across all credentials while translating chunk {chunk}")]
    QuotaExhausted {
        /// 1-based chunk number
        chunk: usize,
    },

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
