//! Streaming chat relay handler.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::Stream;
use relay_core::{ChatRequest, RelayError};
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::relay;
use crate::ServerState;

/// POST /api/chat - Relay a chat to the backend as server-sent events.
///
/// The backend call is established before the response starts, so a
/// rejected or unreachable backend yields a plain error response.
pub async fn relay_chat(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Result<Sse<impl Stream<Item = Result<Event, RelayError>>>, AppError> {
    let span = info_span!("chat", request_id = %Uuid::new_v4());
    let params = ChatRequest::from_value(&body).resolve(&state.defaults);

    let chunks = async {
        info!(
            "Relaying {} messages to {} (temperature={}, max_tokens={})",
            params.messages.len(),
            state.backend.model(),
            params.temperature,
            params.max_tokens
        );

        state.backend.chat_stream(&params).await.map_err(|e| {
            error!("Ollama chat request failed: {}", e);
            AppError::from(e)
        })
    }
    .instrument(span.clone())
    .await?;

    Ok(Sse::new(relay::event_stream(chunks, span)))
}
