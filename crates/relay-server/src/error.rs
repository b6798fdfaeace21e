//! Application error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::RelayError;
use serde::Serialize;

/// Application-level errors with HTTP status code mapping.
#[derive(Debug)]
pub enum AppError {
    /// Backend rejected the request; its status code is passed through.
    Upstream { status: StatusCode, message: String },
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upstream { status, .. } => *status,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        let message = e.to_string();
        match e {
            RelayError::Upstream { status, .. } => AppError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            },
            RelayError::Unreachable(_) => AppError::BadGateway(message),
            RelayError::Timeout(_) => AppError::GatewayTimeout(message),
            RelayError::Stream(_) | RelayError::Parse(_) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Upstream { message, .. }
            | AppError::BadGateway(message)
            | AppError::GatewayTimeout(message)
            | AppError::Internal(message) => message,
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
