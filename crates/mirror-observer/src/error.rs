//! Error types for the Observer API server.
//!
//! [`ApiError`] unifies all failure modes of the HTTP layer into a single
//! enum that converts into an Axum response with a JSON
//! `{"error": ..., "status": ...}` body via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mirror_core::MonitorError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The monitor rejected the request.
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Monitor(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
