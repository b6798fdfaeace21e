use std::sync::Arc;

use axum::{extract::State, Json};
use relay_core::BackendStatus;
use tracing::{debug, warn};

use crate::ServerState;

/// GET /api/ollama-status - Probe backend availability. Always answers 200.
pub async fn ollama_status(State(state): State<Arc<ServerState>>) -> Json<BackendStatus> {
    let status = state.backend.status().await;

    match status.is_online() {
        true => debug!(
            "Ollama online (version {})",
            status.version.as_deref().unwrap_or("unknown")
        ),
        false => warn!("Ollama offline: {}", status.message),
    }

    Json(status)
}
