//! Shared type definitions for the Safety Mirror monitoring service.
//!
//! This crate is the single source of truth for the data that flows
//! between the simulation core and the observer API: detections,
//! metrics snapshots, training run records, and the tagged events
//! pushed to connected observers.
//!
//! # Modules
//!
//! - [`ids`] -- Observer and training run identifiers
//! - [`enums`] -- Safety object catalog, run status, retrain triggers
//! - [`structs`] -- Detections, metrics, training records, generation results
//! - [`events`] -- Observer stream events and their payloads

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{RetrainTrigger, RunStatus, SafetyObject, UnknownSafetyObject};
pub use events::{
    DetectionUpdate, MetricsUpdate, RetrainComplete, ServerEvent, SessionState, SessionStatus,
};
pub use ids::{ObserverId, TrainingRunId};
pub use structs::{
    AugmentationParams, BoundingBox, Detection, GenerationResult, MetricPair, MetricsSnapshot,
    ModelQuality, QualityComparison, TrainingRunRecord, clamp_percent,
};
