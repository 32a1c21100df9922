//! `HttpModelClient` against a throwaway axum server on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use iching_oracle::config::{ApiKey, ModelConfig};
use iching_oracle::model::{HttpModelClient, ModelClient};
use iching_oracle::ModelError;
use serde_json::{json, Value};

const API_KEY: &str = "sk-test-secret";

async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {API_KEY}");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
    let reply = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": format!("echo: {prompt} (max_tokens={})", body["max_tokens"])
            }
        }]
    });
    (StatusCode::OK, Json(reply))
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route(
            "/v1/limited",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route(
            "/v1/broken",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("upstream exploded while using {API_KEY}; {}", "x".repeat(2000)),
                )
            }),
        )
        .route(
            "/v1/empty",
            post(|| async { Json(json!({"choices": []})) }),
        )
        .route(
            "/v1/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"choices": []}))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, path: &str, key: &str, timeout_secs: u64) -> HttpModelClient {
    HttpModelClient::new(&ModelConfig {
        endpoint: format!("http://{addr}{path}"),
        api_key: Some(ApiKey::new(key)),
        model: "mock-model".into(),
        timeout_secs,
        max_tokens: 321,
        temperature: 0.5,
    })
    .unwrap()
}

#[tokio::test]
async fn successful_completion_returns_message_content() {
    let addr = spawn_server().await;
    let model = client(addr, "/v1/chat/completions", API_KEY, 5);
    let reply = model.complete("hello").await.unwrap();
    assert_eq!(reply, "echo: hello (max_tokens=321)");
    assert_eq!(model.model_id(), "mock-model");
}

#[tokio::test]
async fn wrong_key_is_an_auth_failure() {
    let addr = spawn_server().await;
    let model = client(addr, "/v1/chat/completions", "sk-wrong", 5);
    let err = model.complete("hello").await.unwrap_err();
    assert_matches!(err, ModelError::AuthFailed { status: 401 });
}

#[tokio::test]
async fn too_many_requests_is_upstream_rate_limiting() {
    let addr = spawn_server().await;
    let err = client(addr, "/v1/limited", API_KEY, 5)
        .complete("hello")
        .await
        .unwrap_err();
    assert_matches!(err, ModelError::RateLimited { status: 429 });
}

#[tokio::test]
async fn server_errors_are_generic_truncated_and_redacted() {
    let addr = spawn_server().await;
    let err = client(addr, "/v1/broken", API_KEY, 5)
        .complete("hello")
        .await
        .unwrap_err();
    let ModelError::Generic(message) = &err else {
        panic!("expected generic error, got {err:?}");
    };
    assert!(message.starts_with("HTTP 500"));
    assert!(!message.contains(API_KEY));
    assert!(message.chars().count() < 400);
    assert_eq!(err.code(), "EXTERNAL_MODEL_GENERIC");
}

#[tokio::test]
async fn empty_choices_are_a_generic_error() {
    let addr = spawn_server().await;
    let err = client(addr, "/v1/empty", API_KEY, 5)
        .complete("hello")
        .await
        .unwrap_err();
    assert_matches!(err, ModelError::Generic(_));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let addr = spawn_server().await;
    let err = client(addr, "/v1/slow", API_KEY, 1)
        .complete("hello")
        .await
        .unwrap_err();
    assert_matches!(err, ModelError::Timeout { after_secs: 1 });
}
