//! Integration tests for the gateway client and annotator against a mock
//! chat-completions server.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use offnotes_core::annotation::AnnotationRequest;
use offnotes_core::fallback::FALLBACK_NOTE;
use offnotes_core::normalize::MalformedResponse;
use offnotes_llm::annotator::Annotator;
use offnotes_llm::api::{Gateway, GatewayClient, UpstreamError, CLIENT_USER_AGENT};
use offnotes_llm::config::GatewayConfig;
use offnotes_llm::retry::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        timeout_secs: 5,
        retry: RetryPolicy {
            max_retries: 2,
            delay_step: Duration::from_millis(10),
        },
        ..Default::default()
    }
}

fn client_for(server: &MockServer) -> GatewayClient {
    GatewayClient::from_config(&config_for(server))
        .expect("client should build")
        .expect("credential is configured")
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

const CANONICAL: &str =
    r#"{"categories":["Business"],"tags":["sales","marketing"],"summary":"x","confidence":0.9}"#;

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_bearer_credential_and_chat_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("User-Agent", CLIENT_USER_AGENT))
        .and(header("Accept", "application/json"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
            "max_tokens": 400
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(CANONICAL)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let envelope = client
        .call_once(&AnnotationRequest::new("Test sales meeting"), "gpt-4o-mini")
        .await
        .expect("call should succeed");

    assert_eq!(envelope["choices"][0]["message"]["content"], CANONICAL);
}

#[tokio::test]
async fn status_401_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .call_once(&AnnotationRequest::new("t"), "m")
        .await;
    assert_matches!(result, Err(UpstreamError::Unauthorized));
}

#[tokio::test]
async fn status_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({})))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .call_once(&AnnotationRequest::new("t"), "m")
        .await;
    assert_matches!(result, Err(UpstreamError::RateLimited));
}

#[tokio::test]
async fn other_error_status_keeps_code_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .call_once(&AnnotationRequest::new("t"), "m")
        .await;
    assert_matches!(
        result,
        Err(UpstreamError::BadStatus { status: 503, ref body }) if body == "overloaded"
    );
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .call_once(&AnnotationRequest::new("t"), "m")
        .await;
    assert_matches!(
        result,
        Err(UpstreamError::Malformed(MalformedResponse::InvalidJson(_)))
    );
}

#[tokio::test]
async fn slow_gateway_times_out_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply(CANONICAL))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = GatewayConfig {
        timeout_secs: 1,
        ..config_for(&server)
    };
    let client = GatewayClient::from_config(&config).unwrap().unwrap();
    let result = client.call_once(&AnnotationRequest::new("t"), "m").await;
    assert_matches!(result, Err(UpstreamError::Unreachable(_)));
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let uri = format!("http://127.0.0.1:{port}");
    let config = GatewayConfig {
        api_key: Some("k".into()),
        base_url: uri,
        timeout_secs: 2,
        ..Default::default()
    };
    let client = GatewayClient::from_config(&config).unwrap().unwrap();
    let result = client.call_once(&AnnotationRequest::new("t"), "m").await;
    assert_matches!(result, Err(UpstreamError::Unreachable(_)));
}

// ---------------------------------------------------------------------------
// Annotator over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn annotator_returns_gateway_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(CANONICAL)))
        .expect(1)
        .mount(&server)
        .await;

    let annotator = Annotator::from_config(config_for(&server)).unwrap();
    let result = annotator
        .annotate(&AnnotationRequest::new("Test sales meeting"))
        .await;

    assert_eq!(result.categories, vec!["Business"]);
    assert_eq!(result.tags, vec!["sales", "marketing"]);
    assert_eq!(result.confidence, Some(0.9));
    assert_eq!(result.metadata["source"], "emergent-llm");
    assert_eq!(result.metadata["gateway"], server.uri());
}

#[tokio::test]
async fn annotator_makes_every_attempt_then_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let annotator = Annotator::from_config(config_for(&server)).unwrap();
    let result = annotator.annotate(&AnnotationRequest::new("Hello there")).await;

    assert_eq!(result.metadata["note"], FALLBACK_NOTE);
    assert_eq!(result.metadata["error_kind"], "rate_limited");
    assert_eq!(result.metadata["attempts"], 3);
    assert_eq!(result.summary, "Hello there");
}

#[tokio::test]
async fn annotator_recovers_from_fenced_reply() {
    let server = MockServer::start().await;
    let fenced = format!("```json\n{CANONICAL}\n```");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&fenced)))
        .mount(&server)
        .await;

    let annotator = Annotator::from_config(config_for(&server)).unwrap();
    let result = annotator.annotate(&AnnotationRequest::new("t")).await;
    assert_eq!(result.categories, vec!["Business"]);
}

#[tokio::test]
async fn annotator_uses_shared_gateway_trait_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": CANONICAL })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let gateway: Arc<dyn Gateway> = Arc::new(client_for(&server));
    let annotator = Annotator::new(Some(gateway), config);
    let result = annotator.annotate(&AnnotationRequest::new("t")).await;
    assert_eq!(result.tags, vec!["sales", "marketing"]);
}
