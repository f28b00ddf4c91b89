// Error handling across the real provider clients, retries and the HTTP layer
use std::env;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;

use trainprompt::config::{Config, GenerationConfig, RetryConfig, ServerConfig};
use trainprompt::error::ErrorKind;
use trainprompt::llm::client::LlmClient;
use trainprompt::llm::client_impl::GeminiClient;
use trainprompt::llm::credentials::CredentialPool;
use trainprompt::llm::factory;
use trainprompt::llm::retry::RetryingClient;
use trainprompt::pipeline::{PromptGenerator, Selection};
use trainprompt::server::{router, AppState};

const GEMINI_PATH: &str = "/models/gemini-1.5-pro:generateContent";

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

fn gemini_generator(server: &mockito::Server, retries: u32) -> PromptGenerator {
    let client = GeminiClient::new(
        CredentialPool::single("test-key"),
        "gemini-1.5-pro".to_string(),
        Some(server.url()),
        5,
    )
    .unwrap();
    PromptGenerator::new(
        Box::new(RetryingClient::new(client, fast_retry(retries))),
        GenerationConfig::default(),
    )
}

fn selection() -> Selection {
    Selection::new(
        "Training Modules",
        "Entry-Level Employees",
        "Self-Paced Learning",
        "Soft Skills",
        "Retail and E-commerce",
    )
}

#[test]
#[serial]
fn test_missing_api_key() {
    env::remove_var("TRAINPROMPT_TEST_NONEXISTENT_KEY_12345");
    let mut config = Config::default();
    config.llm.api_key_env = Some("TRAINPROMPT_TEST_NONEXISTENT_KEY_12345".to_string());
    let result = factory::create_client(&config, false);
    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("API key not found"));
    }
}

#[test]
#[serial]
fn test_invalid_provider() {
    env::set_var("TRAINPROMPT_TEST_DUMMY_KEY", "test_key");
    let mut config = Config::default();
    config.llm.provider = "invalid_provider".to_string();
    config.llm.api_key_env = Some("TRAINPROMPT_TEST_DUMMY_KEY".to_string());
    let result = factory::create_client(&config, false);
    env::remove_var("TRAINPROMPT_TEST_DUMMY_KEY");
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_blank_key_list_is_rejected() {
    env::set_var("TRAINPROMPT_TEST_BLANK_KEYS", " , ");
    let mut config = Config::default();
    config.llm.api_key_env = Some("TRAINPROMPT_TEST_BLANK_KEYS".to_string());
    let result = factory::create_client(&config, false);
    env::remove_var("TRAINPROMPT_TEST_BLANK_KEYS");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_auth_error_is_not_retried_and_maps_to_502() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GEMINI_PATH)
        .with_status(401)
        .with_body(r#"{"error": {"code": 401, "status": "UNAUTHENTICATED"}}"#)
        .expect(1)
        .create_async()
        .await;

    let app = router(AppState::new(gemini_generator(&server, 3), &ServerConfig::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/generate_prompts")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&selection()).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["kind"], "provider_unavailable");
    assert!(body.get("prompts").is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_retried_up_to_bound() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GEMINI_PATH)
        .with_status(503)
        .with_body("overloaded")
        .expect(3)
        .create_async()
        .await;

    let err = gemini_generator(&server, 2)
        .generate_prompts(&selection(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_structured_reply_from_provider() {
    let mut server = mockito::Server::new_async().await;
    let prompts = json!({
        "prompts": [
            {"prompt": "P1", "summary": "S1"},
            {"prompt": "P2", "summary": "S2"},
            {"prompt": "P3", "summary": "S3"},
            {"prompt": "P4", "summary": "S4"}
        ]
    });
    let envelope = json!({
        "candidates": [{"content": {"parts": [{"text": prompts.to_string()}]}, "finishReason": "STOP"}]
    });
    let _mock = server
        .mock("POST", GEMINI_PATH)
        .match_body(mockito::Matcher::PartialJson(json!({
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .with_status(200)
        .with_body(envelope.to_string())
        .create_async()
        .await;

    let items = gemini_generator(&server, 0)
        .generate_prompts(&selection(), None)
        .await
        .unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[2].summary.as_deref(), Some("S3"));
}

#[tokio::test]
async fn test_safety_block_is_rejected_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GEMINI_PATH)
        .with_status(200)
        .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
        .expect(1)
        .create_async()
        .await;

    let err = gemini_generator(&server, 3)
        .generate_prompts(&selection(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderRejected);
    mock.assert_async().await;
}

#[test]
fn test_retrying_client_keeps_provider_name() {
    let client = GeminiClient::new(
        CredentialPool::anonymous(),
        "gemini-1.5-pro".to_string(),
        None,
        5,
    )
    .unwrap();
    let retrying = RetryingClient::new(client, fast_retry(1));
    assert_eq!(retrying.name(), "gemini");
}
