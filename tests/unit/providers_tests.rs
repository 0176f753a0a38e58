/*!
 * Tests for provider implementations
 */

use reqwest::StatusCode;
use resub::errors::ProviderError;
use resub::providers::{CompletionRequest, Provider};
use resub::providers::gemini::Gemini;
use resub::providers::mock::{MockBehavior, MockProvider};
use resub::translation::{ClientOptions, Credential, TranslationClient, TranslationOutcome};

fn request(payload: &str) -> CompletionRequest {
    CompletionRequest {
        system: "system".to_string(),
        instruction: "Translate these subtitles into French:".to_string(),
        payload: payload.to_string(),
        temperature: Some(0.3),
    }
}

#[test]
fn test_completion_request_prompt_shouldPrefixInstruction() {
    assert_eq!(request("a|b").prompt(), "Translate these subtitles into French: a|b");
}

#[test]
fn test_gemini_url_withTrailingSlash_shouldNotDoubleSlash() {
    let gemini = Gemini::new("https://example.test/", "gemini-2.5-flash", 5).unwrap();
    assert_eq!(
        gemini.generate_url().unwrap().as_str(),
        "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
    );
    assert_eq!(gemini.name(), "Gemini");
}

#[test]
fn test_gemini_errors_shouldClassifyLikeTheClient() {
    let quota = Gemini::map_error_response(
        StatusCode::TOO_MANY_REQUESTS,
        Some(30),
        r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
    );
    assert!(matches!(quota, ProviderError::RateLimitExceeded { retry_after_secs: Some(30), .. }));
    assert!(matches!(TranslationClient::classify_error(&quota), TranslationOutcome::QuotaExceeded(_)));

    let denied = Gemini::map_error_response(StatusCode::FORBIDDEN, None, "forbidden");
    assert!(matches!(TranslationClient::classify_error(&denied), TranslationOutcome::AuthFailure(_)));

    let unavailable = Gemini::map_error_response(StatusCode::SERVICE_UNAVAILABLE, None, "overloaded");
    assert!(matches!(TranslationClient::classify_error(&unavailable), TranslationOutcome::TransientFailure(_)));
}

#[tokio::test]
async fn test_mock_test_connection_shouldReportRejectedKey() {
    let mock = MockProvider::working().with_credential_behavior("bad-key", MockBehavior::AuthFailure);

    assert!(mock.test_connection(&Credential::new("good-key")).await.is_ok());
    let refused = mock.test_connection(&Credential::new("bad-key")).await;
    assert!(matches!(refused, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_mock_custom_delimiter_shouldTranslateEachUnit() {
    let mock = MockProvider::working().with_delimiter('#');
    let response = mock.complete(&Credential::new("k"), &request("a#b")).await.unwrap();
    assert_eq!(response.text, "[TR] a#[TR] b");
    assert_eq!(mock.calls()[0].units, 2);
}

#[tokio::test]
async fn test_client_system_prompt_shouldCarryTargetAndContext() {
    let options = ClientOptions {
        target_language: "Portuguese (Brazil)".to_string(),
        context: Some("This is a subtitle for \"Lost\".".to_string()),
        delimiter: '|',
        temperature: Some(0.3),
    };
    let client = TranslationClient::new(
        std::sync::Arc::new(MockProvider::working()),
        options,
        resub::translation::stats::shared_stats(),
    );

    assert!(client.system_prompt().contains("Portuguese (Brazil)"));
    assert!(client.system_prompt().contains("CONTEXT: This is a subtitle for \"Lost\"."));
    assert_eq!(client.delimiter(), '|');
}
