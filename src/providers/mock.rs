/*!
 * Scripted in-process backend for tests and dry runs.
 *
 * Replies are picked in this order:
 * 1. a behavior pinned to the credential used for the call,
 * 2. the next entry of the FIFO script,
 * 3. the default behavior.
 *
 * Every call is recorded so tests can assert which credential served which
 * payload. Each call yields to the runtime once before answering, so the two
 * halves of a bisected chunk really interleave.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::translation::credentials::Credential;
use super::{CompletionRequest, CompletionResponse, Provider};

/// Prefix the `Translating` behavior puts in front of every unit
pub const MOCK_TRANSLATION_PREFIX: &str = "[TR] ";

/// Behavior mode for one mock reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Prefixes every unit of the payload
    Translating,
    /// Returns the payload unchanged
    Echo,
    /// Translates only the first `keep` units
    Truncating { keep: usize },
    /// Returns a fixed text
    Fixed(String),
    /// Fails with a quota error
    QuotaExceeded,
    /// Fails with an authentication error
    AuthFailure,
    /// Fails with a 500
    ServerError,
    /// Returns an empty text
    Empty,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Raw key of the credential used
    pub credential: String,
    /// Delimited payload that was sent
    pub payload: String,
    /// Number of units in the payload
    pub units: usize,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_behavior: MockBehavior,
    delimiter: char,
    script: Arc<Mutex<VecDeque<MockBehavior>>>,
    pinned: Arc<Mutex<HashMap<String, MockBehavior>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified default behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            default_behavior: behavior,
            delimiter: '|',
            script: Arc::new(Mutex::new(VecDeque::new())),
            pinned: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mock that translates every unit
    pub fn working() -> Self {
        Self::new(MockBehavior::Translating)
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replies consumed one per call before falling back to the default
    pub fn with_script(self, script: impl IntoIterator<Item = MockBehavior>) -> Self {
        self.script.lock().extend(script);
        self
    }

    /// Always answer calls made with `key` using `behavior`
    pub fn with_credential_behavior(self, key: impl Into<String>, behavior: MockBehavior) -> Self {
        self.pinned.lock().insert(key.into(), behavior);
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Credentials in call order
    pub fn credentials_used(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.credential.clone()).collect()
    }

    /// Expected output of the `Translating` behavior for one unit
    pub fn translated(text: &str) -> String {
        format!("{}{}", MOCK_TRANSLATION_PREFIX, text)
    }

    fn next_behavior(&self, credential: &Credential) -> MockBehavior {
        if let Some(pinned) = self.pinned.lock().get(credential.expose()) {
            return pinned.clone();
        }
        self.script.lock().pop_front().unwrap_or_else(|| self.default_behavior.clone())
    }

    fn translate_units(&self, payload: &str, keep: usize) -> String {
        payload.split(self.delimiter)
            .take(keep)
            .map(Self::translated)
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        // suspend like a network call so concurrent callers interleave
        tokio::task::yield_now().await;
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let units = request.payload.split(self.delimiter).count();
        self.calls.lock().push(MockCall {
            credential: credential.expose().to_string(),
            payload: request.payload.clone(),
            units,
        });

        let text = match self.next_behavior(credential) {
            MockBehavior::Translating => self.translate_units(&request.payload, usize::MAX),
            MockBehavior::Echo => request.payload.clone(),
            MockBehavior::Truncating { keep } => self.translate_units(&request.payload, keep),
            MockBehavior::Fixed(text) => text,
            MockBehavior::Empty => String::new(),
            MockBehavior::QuotaExceeded => {
                return Err(ProviderError::RateLimitExceeded {
                    message: "Resource has been exhausted (e.g. check quota).".to_string(),
                    retry_after_secs: None,
                });
            }
            MockBehavior::AuthFailure => {
                return Err(ProviderError::AuthenticationError("API key not valid".to_string()));
            }
            MockBehavior::ServerError => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "Internal error".to_string(),
                });
            }
        };

        Ok(CompletionResponse {
            prompt_tokens: Some(request.payload.len() as u64),
            completion_tokens: Some(text.len() as u64),
            finish_reason: Some("STOP".to_string()),
            text,
        })
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
