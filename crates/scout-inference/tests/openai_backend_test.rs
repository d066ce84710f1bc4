//! Integration tests for the OpenAI-compatible backend against a mock server.

use std::sync::Arc;
use std::time::Duration;

use scout_core::{EmbeddingBackend, Error, GenerationBackend};
use scout_inference::openai::{OpenAIBackend, OpenAIConfig};
use scout_inference::{QueryTranslator, RetryPolicy};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> OpenAIConfig {
    OpenAIConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        embed_model: "test-embed".to_string(),
        chat_model: "test-chat".to_string(),
        embed_dimension: 4,
        temperature: 0.0,
        timeout_seconds: 5,
    }
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_backoff: Duration::from_millis(1),
        attempt_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_embeddings_are_returned_in_index_order() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "data": [
            { "embedding": [0.0, 1.0, 0.0, 0.0], "index": 1 },
            { "embedding": [1.0, 0.0, 0.0, 0.0], "index": 0 }
        ],
        "model": "test-embed"
    });

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({ "model": "test-embed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAIBackend::new(config(&server)).unwrap();
    let vectors = backend
        .embed_texts(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].as_slice(), &[1.0, 0.0, 0.0, 0.0]);
    assert_eq!(vectors[1].as_slice(), &[0.0, 1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_embedding_server_error_maps_to_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": { "message": "overloaded", "type": "server_error" }
        })))
        .mount(&server)
        .await;

    let backend = OpenAIBackend::new(config(&server)).unwrap();
    let err = backend.embed_texts(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingFailure(ref m) if m.contains("overloaded")));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_bad_credentials_map_to_config_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "invalid key", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let backend = OpenAIBackend::new(config(&server)).unwrap();
    let err = backend.generate_with_system("sys", "hello").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_chat_completion_sends_zero_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-chat",
            "temperature": 0.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Accountant" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAIBackend::new(config(&server)).unwrap();
    let text = backend.generate_with_system("sys", "Нягтлан").await.unwrap();
    assert_eq!(text, "Accountant");
}

#[tokio::test]
async fn test_translator_retries_then_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let backend = Arc::new(OpenAIBackend::new(config(&server)).unwrap());
    let translator = QueryTranslator::new(backend, fast_retry(2));
    let outcome = translator.translate("Ахлах нягтлан бодогч").await;

    assert_eq!(outcome.value, "Ахлах нягтлан бодогч");
    assert!(outcome.degradation.translation_failed);
}

#[tokio::test]
async fn test_translator_skips_upstream_for_english() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = Arc::new(OpenAIBackend::new(config(&server)).unwrap());
    let translator = QueryTranslator::new(backend, fast_retry(2));
    let outcome = translator.translate("Senior Accountant").await;

    assert_eq!(outcome.value, "Senior Accountant");
    assert!(!outcome.is_degraded());
}
