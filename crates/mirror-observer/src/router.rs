//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS restricted to the configured dashboard origins.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- service name and status
/// - `GET /ws` -- `WebSocket` event stream
/// - `GET /api/health`, `GET /api/metrics`, `GET /api/logs`
/// - `POST /api/predict`, `POST /api/detection/frame`
/// - `POST /api/detection/start`, `POST /api/detection/stop`
/// - `POST /api/resimulate`, `POST /api/retrain`
///
/// Origins that are not valid header values are skipped with a warning.
pub fn build_router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .monitor
        .config()
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin = %origin, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_events))
        // Detection
        .route("/api/predict", post(handlers::predict))
        .route("/api/detection/frame", post(handlers::detection_frame))
        .route("/api/detection/start", post(handlers::start_detection))
        .route("/api/detection/stop", post(handlers::stop_detection))
        // Pipeline
        .route("/api/resimulate", post(handlers::resimulate))
        .route("/api/retrain", post(handlers::retrain))
        // Queries
        .route("/api/metrics", get(handlers::metrics))
        .route("/api/logs", get(handlers::logs))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
