//! Shared application state for the Observer API server.
//!
//! [`AppState`] is a thin handle around the [`Monitor`]. The monitor owns
//! every piece of mutable service state; handlers and `WebSocket`
//! connections only call its operations.

use std::sync::Arc;

use mirror_core::Monitor;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The monitor all handlers act on.
    pub monitor: Arc<Monitor>,
}

impl AppState {
    /// Create application state around an existing monitor.
    pub const fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    /// Model version reported by prediction endpoints.
    pub fn model_version(&self) -> &str {
        &self.monitor.config().detection.model_version
    }
}
