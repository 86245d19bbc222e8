//! Events pushed to connected observers.
//!
//! Every event is serialized as `{"type": "<kind>", "data": {...}}` and
//! every payload carries the `timestamp` at which it was emitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::structs::{Detection, MetricsSnapshot, TrainingRunRecord};

/// Tagged event delivered over the observer stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Periodic detection snapshot, only while detection is active.
    DetectionUpdate(DetectionUpdate),
    /// Periodic metrics snapshot.
    MetricsUpdate(MetricsUpdate),
    /// Detection session switched on.
    DetectionStarted(SessionStatus),
    /// Detection session switched off.
    DetectionStopped(SessionStatus),
    /// A retrain run was appended to the history.
    RetrainComplete(RetrainComplete),
}

impl ServerEvent {
    /// The wire discriminator of this event.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DetectionUpdate(_) => "detection_update",
            Self::MetricsUpdate(_) => "metrics_update",
            Self::DetectionStarted(_) => "detection_started",
            Self::DetectionStopped(_) => "detection_stopped",
            Self::RetrainComplete(_) => "retrain_complete",
        }
    }

    /// Whether this is a state-transition notification rather than a
    /// periodic snapshot.
    #[cfg(test)]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::DetectionStarted(_) | Self::DetectionStopped(_) | Self::RetrainComplete(_)
        )
    }
}

/// Payload of [`ServerEvent::DetectionUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionUpdate {
    /// Fresh detections for this tick.
    pub detections: Vec<Detection>,
    /// Metrics at the time of the tick.
    pub metrics: MetricsSnapshot,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

/// Payload of [`ServerEvent::MetricsUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    /// Current metrics, flattened into the payload.
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

/// Whether the detection session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Detection snapshots are being streamed.
    Active,
    /// Only metrics snapshots are streamed.
    Inactive,
}

/// Payload of the detection start/stop events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// The new session state.
    pub status: SessionState,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

/// Payload of [`ServerEvent::RetrainComplete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainComplete {
    /// The record that was appended.
    #[serde(flatten)]
    pub record: TrainingRunRecord,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}
