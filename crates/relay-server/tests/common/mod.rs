#![allow(dead_code)]

pub mod mock_ollama;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use relay_config::RelayConfig;
use relay_llm::{ClientOptions, OllamaClient};
use relay_server::{build_app, ServerState};
use serde_json::Value;
use tokio::net::TcpListener;

pub const STATUS_TIMEOUT: Duration = Duration::from_millis(500);

/// Relay router pointed at `base_url`, with default chat settings.
pub fn relay_app(base_url: &str) -> Router {
    let options = ClientOptions {
        chat_timeout: Duration::from_secs(5),
        status_timeout: STATUS_TIMEOUT,
    };
    let client = OllamaClient::new(base_url, "llama3.2", options).unwrap();
    let defaults = RelayConfig::default().chat_defaults();
    build_app(Arc::new(ServerState::new(Arc::new(client), defaults)))
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn chat_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Payloads of the `data:` lines of an SSE body, in order.
pub fn sse_data(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(String::from)
        .collect()
}

/// Text fragments carried by the `{"text": ...}` events of an SSE body.
pub fn sse_texts(body: &str) -> Vec<String> {
    sse_data(body)
        .iter()
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .filter_map(|v| v["text"].as_str().map(String::from))
        .collect()
}

/// Ollama-style chunk carrying one content fragment.
pub fn content_chunk(text: &str) -> String {
    serde_json::json!({
        "model": "llama3.2",
        "created_at": "2024-11-02T10:00:00Z",
        "message": { "role": "assistant", "content": text },
        "done": false
    })
    .to_string()
}
