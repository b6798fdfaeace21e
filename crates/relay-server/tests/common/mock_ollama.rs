//! Mock Ollama server for testing

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;

/// How the mock answers `POST /api/chat`.
#[derive(Clone)]
pub enum ChatReply {
    /// Stream each entry as its own body frame, newline-terminated.
    Lines(Vec<String>),
    /// Reject with the given status and body.
    Reject(u16, String),
    /// Stream the lines, then fail the body after a short pause.
    Abort(Vec<String>),
}

/// How the mock answers `GET /api/version`.
#[derive(Clone)]
pub enum VersionReply {
    Json(Value),
    Status(u16),
    /// Never answer within any reasonable timeout.
    Hang,
}

#[derive(Clone)]
struct MockState {
    chat: ChatReply,
    version: VersionReply,
    captured: Arc<Mutex<Vec<Value>>>,
}

pub struct MockOllama {
    addr: SocketAddr,
    captured: Arc<Mutex<Vec<Value>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockOllama {
    pub async fn start(chat: ChatReply, version: VersionReply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));

        let state = MockState {
            chat,
            version,
            captured: captured.clone(),
        };

        let app = Router::new()
            .route("/api/chat", post(mock_chat))
            .route("/api/version", get(mock_version))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            captured,
            _handle: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Chat request bodies received so far.
    pub fn captured(&self) -> Vec<Value> {
        self.captured.lock().unwrap().clone()
    }
}

async fn mock_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.captured.lock().unwrap().push(body);

    match state.chat {
        ChatReply::Lines(lines) => {
            let frames = lines
                .into_iter()
                .map(|line| Ok::<_, Infallible>(format!("{}\n", line)));
            Body::from_stream(stream::iter(frames)).into_response()
        }
        ChatReply::Abort(lines) => {
            let frames = stream::iter(
                lines
                    .into_iter()
                    .map(|line| Ok::<_, io::Error>(format!("{}\n", line))),
            );
            let failure = stream::once(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err::<String, _>(io::Error::new(io::ErrorKind::ConnectionReset, "backend crashed"))
            });
            Body::from_stream(frames.chain(failure)).into_response()
        }
        ChatReply::Reject(code, body) => {
            (StatusCode::from_u16(code).unwrap(), body).into_response()
        }
    }
}

async fn mock_version(State(state): State<MockState>) -> Response {
    match state.version {
        VersionReply::Json(value) => Json(value).into_response(),
        VersionReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        VersionReply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::OK.into_response()
        }
    }
}
