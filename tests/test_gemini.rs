//! Integration tests for the Gemini provider
//!
//! Tests behavioral contracts against a mock HTTP server:
//! - Request shape (system instruction, tools, auth header)
//! - Text and function-call responses
//! - HTTP status mapping
//! - Retry policy boundary around the provider

use ecc_pipeline::config::EccConfig;
use ecc_pipeline::llm::{
    CompletionRequest, FinishReason, GeminiConfig, GeminiProvider, LlmError, LlmProvider,
    Message, RetryPolicy,
};
use ecc_pipeline::testing::MemorySink;
use ecc_pipeline::tools::{ToolDescription, ToolSystem};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";
const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn test_provider(base_url: &str) -> GeminiProvider {
    GeminiProvider::new(GeminiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn test_request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            Message::system("You are a planner."),
            Message::user("Plan my week"),
        ],
        model: MODEL.to_string(),
        max_tokens: Some(256),
        temperature: Some(0.2),
        tools: None,
        metadata: HashMap::new(),
    }
}

fn text_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 12,
            "candidatesTokenCount": 8,
            "totalTokenCount": 20
        },
        "modelVersion": "gemini-2.0-flash-001"
    })
}

#[tokio::test]
async fn test_gemini_returns_text_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "You are a planner."}]},
            "contents": [{"role": "user", "parts": [{"text": "Plan my week"}]}],
            "generationConfig": {"maxOutputTokens": 256}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Here is the plan")))
        .expect(1)
        .mount(&server)
        .await;

    let response = test_provider(&server.uri())
        .complete(test_request())
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Here is the plan"));
    assert_eq!(response.model, "gemini-2.0-flash-001");
    assert_eq!(response.usage.total_tokens, 20);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn test_gemini_sends_tools_and_parses_function_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "tools": [{"functionDeclarations": [{"name": "get_open_loops"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "get_open_loops", "args": {}}}
                ]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let mut request = test_request();
    request.tools = Some(vec![ToolDescription {
        name: "get_open_loops".to_string(),
        description: "Open commitments".to_string(),
        parameters: json!({"type": "object", "properties": {}, "additionalProperties": false}),
        output: json!({"type": "object"}),
    }]);

    let response = test_provider(&server.uri())
        .complete(request)
        .await
        .unwrap();

    assert!(response.content.is_none());
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_open_loops");
    assert_eq!(calls[0].id, "call_0");
}

#[tokio::test]
async fn test_gemini_call_without_args_passes_tool_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "get_open_loops"}}
                ]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let response = test_provider(&server.uri())
        .complete(test_request())
        .await
        .unwrap();
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls[0].arguments, json!({}));

    let mut tools = ToolSystem::with_sink(Arc::new(MemorySink::new()));
    tools
        .initialize(&EccConfig::default().tools)
        .await
        .unwrap();
    let result = tools
        .execute_tool(&calls[0].name, &calls[0].arguments)
        .await
        .unwrap();
    assert_eq!(result["status"], "success");
}

#[tokio::test]
async fn test_gemini_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(test_request())
        .await
        .unwrap_err();

    match err {
        LlmError::HttpStatus { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_gemini_rejects_empty_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(test_request())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[test]
fn test_gemini_requires_api_key() {
    let result = GeminiProvider::new(GeminiConfig {
        api_key: String::new(),
        ..Default::default()
    });
    assert!(matches!(result, Err(LlmError::NotConfigured(_))));
}

async fn run_with_policy(
    provider: &GeminiProvider,
    policy: &RetryPolicy,
) -> Result<ecc_pipeline::llm::CompletionResponse, LlmError> {
    policy
        .run("gemini-test", |_| provider.complete(test_request()))
        .await
}

#[tokio::test]
async fn test_retry_succeeds_after_attempts_minus_one_failures() {
    let server = MockServer::start().await;
    let policy = RetryPolicy::default().without_delay();

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(u64::from(policy.attempts - 1))
        .expect(u64::from(policy.attempts - 1))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let response = run_with_policy(&test_provider(&server.uri()), &policy)
        .await
        .unwrap();
    assert_eq!(response.content.as_deref(), Some("recovered"));
}

#[tokio::test]
async fn test_retry_gives_up_after_attempts_failures() {
    let server = MockServer::start().await;
    let policy = RetryPolicy::default().without_delay();

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(u64::from(policy.attempts))
        .mount(&server)
        .await;

    let err = run_with_policy(&test_provider(&server.uri()), &policy)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = run_with_policy(
        &test_provider(&server.uri()),
        &RetryPolicy::default().without_delay(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LlmError::HttpStatus { status: 400, .. }));
}
