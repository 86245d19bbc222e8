//! Observer API server for the Safety Mirror service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) streaming detection snapshots,
//!   metrics ticks, and lifecycle events to each connected dashboard
//! - **Detection endpoints** for single images and live frames, plus
//!   session start/stop
//! - **Pipeline endpoints** for synthetic data generation and retraining
//! - **Query endpoints** for current metrics and the training history
//!
//! # Architecture
//!
//! All state lives in a single [`Monitor`](mirror_core::Monitor) shared
//! through [`AppState`]. Every `WebSocket` connection is served by its
//! own [`BroadcastLoop`](mirror_core::BroadcastLoop), registered with the
//! monitor's observer registry for as long as the socket stays open.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
