use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::translation::credentials::Credential;
use super::{CompletionRequest, CompletionResponse, Provider};

// @const: "41s" / "1.5s" style delays in RetryInfo details
static RETRY_DELAY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)(?:\.\d+)?s$").unwrap()
});

/// Gemini client for the `generateContent` API
#[derive(Debug, Clone)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, without the API version
    endpoint: String,
    /// Model name
    model: String,
}

/// Gemini generation request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation turns
    contents: Vec<GeminiContent>,

    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,

    /// Sampling parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Content block shared by requests and responses
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role of the author (user, model)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text parts
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Single text part
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Gemini generation response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Self::new(&config.endpoint, &config.model, config.timeout_secs)
    }

    /// Full `generateContent` URL for the configured model
    pub fn generate_url(&self) -> Result<Url, ProviderError> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        Url::parse(&raw).map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint URL {}: {}", raw, e)))
    }

    fn build_request(request: &CompletionRequest) -> GeminiRequest {
        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: request.system.clone() }],
            })
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: request.prompt() }],
            }],
            system_instruction,
            generation_config: request.temperature.map(|t| GenerationConfig { temperature: Some(t) }),
        }
    }

    /// Map a non-success HTTP answer to a provider error
    pub fn map_error_response(status: StatusCode, retry_after_header: Option<u64>, body: &str) -> ProviderError {
        let (message, api_status, details) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.message, envelope.error.status.unwrap_or_default(), envelope.error.details),
            Err(_) => (body.trim().to_string(), String::new(), Vec::new()),
        };
        let message = if message.is_empty() { status.to_string() } else { message };

        let auth_rejected = status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || api_status == "UNAUTHENTICATED"
            || api_status == "PERMISSION_DENIED"
            || (status == StatusCode::BAD_REQUEST && message.to_lowercase().contains("api key not valid"));
        if auth_rejected {
            return ProviderError::AuthenticationError(message);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
            let retry_after_secs = retry_after_header.or_else(|| Self::retry_delay_from_details(&details));
            return ProviderError::RateLimitExceeded { message, retry_after_secs };
        }

        ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        }
    }

    fn retry_delay_from_details(details: &[serde_json::Value]) -> Option<u64> {
        details.iter()
            .filter_map(|detail| detail.get("retryDelay").and_then(|v| v.as_str()))
            .find_map(|delay| {
                RETRY_DELAY_REGEX.captures(delay)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            })
    }

    fn extract_text(response: &GeminiResponse) -> String {
        response.candidates.first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for Gemini {
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let url = self.generate_url()?;
        let body = Self::build_request(request);

        let response = self.client.post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response.headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}) with credential {}: {}", status, credential, error_text);
            return Err(Self::map_error_response(status, retry_after, &error_text));
        }

        let gemini_response = response.json::<GeminiResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e)))?;

        if gemini_response.candidates.is_empty() {
            if let Some(reason) = gemini_response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
                return Err(ProviderError::RequestFailed(format!("Prompt blocked by the backend: {}", reason)));
            }
        }

        let finish_reason = gemini_response.candidates.first().and_then(|c| c.finish_reason.clone());
        if let Some(reason) = finish_reason.as_deref() {
            if reason != "STOP" {
                debug!("Gemini finished with reason {}", reason);
            }
        }

        let usage = gemini_response.usage_metadata.as_ref();
        Ok(CompletionResponse {
            text: Self::extract_text(&gemini_response),
            finish_reason,
            prompt_tokens: usage.and_then(|u| u.prompt_token_count),
            completion_tokens: usage.and_then(|u| u.candidates_token_count),
        })
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}
