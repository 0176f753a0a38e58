/*!
 * Backend clients for the translation service.
 *
 * - `gemini`: Google Gemini `generateContent` API
 * - `mock`: scripted in-process backend used by tests
 *
 * Providers are stateless with respect to credentials: the key to use is
 * passed with every call so that the credential pool stays the single owner
 * of rotation state.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::translation::credentials::Credential;

/// A single text generation request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,

    /// Task sentence placed before the payload
    pub instruction: String,

    /// Delimited subtitle texts
    pub payload: String,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// User message as sent to the model
    pub fn prompt(&self) -> String {
        if self.instruction.is_empty() {
            self.payload.clone()
        } else {
            format!("{} {}", self.instruction, self.payload)
        }
    }
}

/// Generated text plus the metadata the backend reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all backends
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request with the given credential
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Send a minimal request to check that the credential is accepted
    async fn test_connection(&self, credential: &Credential) -> Result<(), ProviderError> {
        let request = CompletionRequest {
            system: String::new(),
            instruction: String::new(),
            payload: "Hello".to_string(),
            temperature: None,
        };
        self.complete(credential, &request).await.map(|_| ())
    }

    /// Human readable backend name
    fn name(&self) -> &str;
}

pub mod gemini;
pub mod mock;
