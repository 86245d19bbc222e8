//! Shared state, simulators, and observer fan-out for the Safety Mirror
//! service.
//!
//! Everything here is transport-agnostic. The HTTP and `WebSocket` surface
//! lives in `mirror-observer`; this crate only needs something that can
//! send a [`ServerEvent`](mirror_types::ServerEvent) to one observer.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `mirror-config.yaml`.
//! - [`monitor`] -- [`Monitor`], the single owner of metrics, the
//!   detection session flag, and the training history.
//! - [`metrics`] -- Live metrics and per-batch updates.
//! - [`history`] -- Append-only training run history.
//! - [`detector`] -- Stub object detector over a fixed scene.
//! - [`pipeline`] -- Synthetic data generation and retrain simulation.
//! - [`registry`] -- Connected observers and best-effort broadcast.
//! - [`broadcast`] -- The per-observer push loop.
//! - [`error`] -- [`MonitorError`].
//!
//! [`Monitor`]: monitor::Monitor
//! [`MonitorError`]: error::MonitorError

pub mod broadcast;
pub mod config;
pub mod detector;
pub mod error;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod pipeline;
pub mod registry;

pub use broadcast::{BroadcastLoop, Disconnect, EventSink, SinkError};
pub use config::{ConfigError, MirrorConfig};
pub use error::MonitorError;
pub use monitor::Monitor;
pub use pipeline::RetrainRequest;
pub use registry::{Observer, ObserverRegistry};
