//! Integration tests for POST /api/chat
//!
//! OpenRouter is replaced by a wiremock server so the full pipeline
//! (auth, memory, classification, upstream call, response shaping) runs
//! without network access.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use autollm::{config::Config, handlers, handlers::AppState};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header as header_matcher, method, path},
};

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

fn create_test_config(mock_url: &str) -> Config {
    let mut config = Config::default();
    config.openrouter.base_url = format!("{}/api/v1", mock_url);
    config.server.request_timeout_seconds = 5;
    config
}

fn create_test_app(config: Config) -> Router {
    let state = AppState::new(Arc::new(config)).expect("AppState::new should succeed");
    handlers::app(state)
}

fn chat_request(body: Value, user: Option<&str>, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user));
    }
    if let Some(key) = key {
        builder = builder.header("x-openrouter-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn user_message(content: &str) -> Value {
    json!({ "messages": [{ "role": "user", "content": content }] })
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "gen-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19 }
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_chat_requires_bearer_token() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(user_message("hello"), None, Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_chat_without_user_message_is_bad_request() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let body = json!({ "messages": [{ "role": "assistant", "content": "Hi there" }] });
    let response = app
        .oneshot(chat_request(body, Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "No user message found" })
    );
}

#[tokio::test]
async fn test_chat_rejects_empty_messages() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(
            json!({ "messages": [] }),
            Some("user-1"),
            Some("sk-test"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    let error = json["error"].as_str().expect("error should be a string");
    assert!(error.contains("messages cannot be empty"), "got: {}", error);
}

#[tokio::test]
async fn test_chat_malformed_json_is_bad_request() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer user-1")
        .header("x-openrouter-key", "sk-test")
        .body(Body::from("{\"messages\": ["))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_chat_without_openrouter_key_is_bad_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(user_message("hello"), Some("user-1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "OpenRouter API key missing. Please provide your key in settings." })
    );
}

#[tokio::test]
async fn test_forget_command_clears_memory_without_upstream_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let set = Request::builder()
        .method("POST")
        .uri("/api/memory")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer user-1")
        .body(Body::from(r#"{"memory":"My name is Alice."}"#))
        .unwrap();
    assert_eq!(app.clone().oneshot(set).await.unwrap().status(), StatusCode::OK);

    let body = json!({
        "conversationId": "conv-7",
        "messages": [{ "role": "user", "content": "Please forget everything about me" }]
    });
    let response = app
        .clone()
        .oneshot(chat_request(body, Some("user-1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["content"],
        "I've cleared my memory of our previous conversations and personal details. We can start fresh!"
    );
    assert_eq!(json["model"], "system");
    assert_eq!(json["classification"], "memory-command");
    assert_eq!(json["conversationId"], "conv-7");

    let get = Request::builder()
        .uri("/api/memory")
        .header(header::AUTHORIZATION, "Bearer user-1")
        .body(Body::empty())
        .unwrap();
    let memory = body_json(app.oneshot(get).await.unwrap()).await;
    assert_eq!(memory, json!({ "memory": null }));
}

#[tokio::test]
async fn test_chat_routes_code_prompt_to_code_model() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header_matcher("authorization", "Bearer sk-test"))
        .and(header_matcher("x-title", "AutoLLM AI App"))
        .and(body_partial_json(json!({
            "model": "qwen/qwen3-30b-a3b:free",
            "temperature": 0.7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("fn main() {}")))
        .expect(1)
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let body = json!({
        "conversationId": "conv-1",
        "messages": [{ "role": "user", "content": "Write a function to reverse a list" }]
    });
    let response = app
        .oneshot(chat_request(body, Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["content"], "fn main() {}");
    assert_eq!(json["model"], "qwen/qwen3-30b-a3b:free");
    assert_eq!(json["classification"], "code");
    assert_eq!(json["conversationId"], "conv-1");
    assert_eq!(json["usage"]["promptTokens"], 12);
    assert_eq!(json["usage"]["completionTokens"], 7);
}

#[tokio::test]
async fn test_personal_details_are_stored_and_sent_as_context() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Nice to meet you")))
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .clone()
        .oneshot(chat_request(
            user_message("Hello, my name is Alice"),
            Some("user-1"),
            Some("sk-test"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = mock_server
        .received_requests()
        .await
        .expect("request recording should be enabled");
    assert_eq!(received.len(), 1);
    let upstream: Value = serde_json::from_slice(&received[0].body).unwrap();
    let messages = upstream["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(
        messages[0]["content"],
        "User's personal context (use this to personalize responses): my name is Alice."
    );
    assert_eq!(messages[1]["role"], "user");

    let get = Request::builder()
        .uri("/api/memory")
        .header(header::AUTHORIZATION, "Bearer user-1")
        .body(Body::empty())
        .unwrap();
    let memory = body_json(app.clone().oneshot(get).await.unwrap()).await;
    assert_eq!(memory["memory"], "my name is Alice.");

    // Another user sees nothing
    let other = Request::builder()
        .uri("/api/memory")
        .header(header::AUTHORIZATION, "Bearer user-2")
        .body(Body::empty())
        .unwrap();
    let memory = body_json(app.oneshot(other).await.unwrap()).await;
    assert_eq!(memory["memory"], Value::Null);
}

#[tokio::test]
async fn test_memory_disabled_sends_no_context() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&mock_server)
        .await;
    let mut config = create_test_config(&mock_server.uri());
    config.memory.enabled = false;
    let app = create_test_app(config);

    let response = app
        .oneshot(chat_request(
            user_message("I live in Lisbon"),
            Some("user-1"),
            Some("sk-test"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = mock_server.received_requests().await.unwrap();
    let upstream: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(upstream["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_upstream_content_uses_fallback() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(user_message("hello"), Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["content"], "No response generated.");
    assert_eq!(json["classification"], "default");
}

#[tokio::test]
async fn test_upstream_rate_limit_passes_through() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit exceeded: free-models-per-day", "code": 429 }
        })))
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(user_message("hello"), Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Rate limit exceeded: free-models-per-day")
    );
}

#[tokio::test]
async fn test_upstream_server_error_is_bad_gateway() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .oneshot(chat_request(user_message("hello"), Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_upstream_timeout_is_gateway_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;
    let mut config = create_test_config(&mock_server.uri());
    config.server.request_timeout_seconds = 1;
    let app = create_test_app(config);

    let response = app
        .oneshot(chat_request(user_message("hello"), Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_streaming_relays_deltas_as_sse() {
    let mock_server = MockServer::start().await;
    let upstream_sse = concat!(
        ": OPENROUTER PROCESSING\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Because \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"physics.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_partial_json(json!({
            "model": "deepseek/deepseek-r1:free",
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream_sse),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let body = json!({
        "conversationId": "conv-3",
        "stream": true,
        "messages": [{ "role": "user", "content": "Why is the sky blue?" }]
    });
    let response = app
        .oneshot(chat_request(body, Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let text = body_text(response).await;
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert_eq!(data.len(), 4, "unexpected events: {:?}", data);

    let meta: Value = serde_json::from_str(data[0]).unwrap();
    assert_eq!(
        meta,
        json!({
            "model": "deepseek/deepseek-r1:free",
            "classification": "reasoning",
            "conversationId": "conv-3"
        })
    );
    assert_eq!(data[1], r#"{"content":"Because "}"#);
    assert_eq!(data[2], r#"{"content":"physics."}"#);
    assert_eq!(data[3], "[DONE]");
}

#[tokio::test]
async fn test_streaming_upstream_error_surfaces_as_error_event() {
    let mock_server = MockServer::start().await;
    let upstream_sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n",
        "data: {\"error\":{\"message\":\"Provider disconnected\"}}\n\n",
    );
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream_sse),
        )
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let body = json!({
        "stream": true,
        "messages": [{ "role": "user", "content": "hello" }]
    });
    let response = app
        .oneshot(chat_request(body, Some("user-1"), Some("sk-test")))
        .await
        .unwrap();

    let text = body_text(response).await;
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert_eq!(data.len(), 4, "unexpected events: {:?}", data);
    assert_eq!(data[1], r#"{"content":"Par"}"#);
    let error: Value = serde_json::from_str(data[2]).unwrap();
    assert!(error["error"].as_str().unwrap().contains("Provider disconnected"));
    assert_eq!(data[3], "[DONE]");
}

#[tokio::test]
async fn test_chat_records_classification_metric() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&mock_server)
        .await;
    let app = create_test_app(create_test_config(&mock_server.uri()));

    let response = app
        .clone()
        .oneshot(chat_request(
            user_message("Analyze this quarterly data"),
            Some("user-1"),
            Some("sk-test"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = body_text(metrics).await;
    assert!(text.contains(r#"autollm_chat_requests_total{classification="analysis"} 1"#));
}
