//! HTTP route handlers for the relay server.

pub mod chat;
pub mod status;

use axum::Json;
use chrono::Utc;
use relay_core::HealthReport;

/// Health check endpoint. Independent of the backend.
pub async fn health() -> Json<HealthReport> {
    Json(HealthReport::healthy(Utc::now().to_rfc3339()))
}
