//! Core data structures shared by the simulator and the observer API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{RetrainTrigger, RunStatus, SafetyObject};
use crate::ids::TrainingRunId;

const PERCENT_MAX: f64 = 100.0;

/// Clamp a percentage into `[0, 100]`, mapping NaN to 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, PERCENT_MAX)
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Axis-aligned box in pixel coordinates.
///
/// Serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Box width.
    pub width: u32,
    /// Box height.
    pub height: u32,
}

impl BoundingBox {
    /// Build a box from its four components.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One simulated sighting of a safety object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detected class.
    #[serde(rename = "class")]
    pub class_name: SafetyObject,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    /// Location of the object in the frame.
    pub bbox: BoundingBox,
    /// When the detection was produced.
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Point-in-time copy of the model performance counters.
///
/// This is what observers and the metrics query receive. All
/// percentage fields are kept within `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Model `mAP` as a percentage.
    pub accuracy: f64,
    /// Mean confidence of the last detection batch, as a percentage.
    #[serde(rename = "confidence")]
    pub mean_confidence: f64,
    /// Rolling frame rate of submitted frames.
    #[serde(rename = "fps")]
    pub frames_per_second: f64,
    /// Number of objects in the last detection batch.
    #[serde(rename = "objects_detected")]
    pub objects_detected_last_batch: u32,
    /// Low-confidence alerts raised since midnight UTC.
    pub alerts_today: u32,
    /// Model precision as a percentage.
    pub precision: f64,
    /// Model recall as a percentage.
    pub recall: f64,
    /// Model F1 score as a percentage.
    pub f1_score: f64,
    /// Total frames submitted since process start.
    pub frames_processed: u64,
}

impl MetricsSnapshot {
    /// The model quality figures (`mAP`, precision, recall, F1).
    pub const fn quality(&self) -> ModelQuality {
        ModelQuality {
            map: self.accuracy,
            precision: self.precision,
            recall: self.recall,
            f1_score: self.f1_score,
        }
    }
}

/// Model quality figures, all percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelQuality {
    /// Mean average precision.
    #[serde(rename = "mAP")]
    pub map: f64,
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1 score.
    pub f1_score: f64,
}

/// A single metric before and after a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPair {
    /// Value before the run.
    pub before: f64,
    /// Value after the run.
    pub after: f64,
}

/// Per-metric before/after pairs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityComparison {
    /// Mean average precision.
    #[serde(rename = "mAP")]
    pub map: MetricPair,
    /// Precision.
    pub precision: MetricPair,
    /// Recall.
    pub recall: MetricPair,
    /// F1 score.
    #[serde(rename = "f1Score")]
    pub f1_score: MetricPair,
}

// ---------------------------------------------------------------------------
// Training history
// ---------------------------------------------------------------------------

/// One completed or failed retrain run. Never modified after append.
///
/// On the wire the before/after figures are paired per metric under
/// `metrics` (see [`QualityComparison`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire", into = "RecordWire")]
pub struct TrainingRunRecord {
    /// Sequence number assigned on append.
    pub id: TrainingRunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Run outcome.
    pub status: RunStatus,
    /// Why the run was started.
    pub trigger: RetrainTrigger,
    /// Simulated wall-clock duration in seconds.
    pub duration_secs: f64,
    /// Model quality before the run.
    pub metrics_before: ModelQuality,
    /// Model quality after the run.
    pub metrics_after: ModelQuality,
    /// `mAP` gain in percentage points.
    pub improvement: f64,
    /// Loss of the last simulated epoch.
    pub final_loss: f64,
    /// Synthetic samples fed to the run.
    pub synthetic_samples_used: u64,
    /// Number of epochs trained.
    pub epochs: u32,
    /// Optimizer learning rate.
    pub learning_rate: f64,
}

impl TrainingRunRecord {
    /// Pair up the before/after figures metric by metric.
    pub const fn comparison(&self) -> QualityComparison {
        let (b, a) = (&self.metrics_before, &self.metrics_after);
        QualityComparison {
            map: MetricPair {
                before: b.map,
                after: a.map,
            },
            precision: MetricPair {
                before: b.precision,
                after: a.precision,
            },
            recall: MetricPair {
                before: b.recall,
                after: a.recall,
            },
            f1_score: MetricPair {
                before: b.f1_score,
                after: a.f1_score,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RecordWire {
    id: TrainingRunId,
    started_at: DateTime<Utc>,
    status: RunStatus,
    trigger: RetrainTrigger,
    duration_secs: f64,
    metrics: QualityComparison,
    improvement: f64,
    final_loss: f64,
    synthetic_samples_used: u64,
    epochs: u32,
    learning_rate: f64,
}

impl From<TrainingRunRecord> for RecordWire {
    fn from(r: TrainingRunRecord) -> Self {
        Self {
            metrics: r.comparison(),
            id: r.id,
            started_at: r.started_at,
            status: r.status,
            trigger: r.trigger,
            duration_secs: r.duration_secs,
            improvement: r.improvement,
            final_loss: r.final_loss,
            synthetic_samples_used: r.synthetic_samples_used,
            epochs: r.epochs,
            learning_rate: r.learning_rate,
        }
    }
}

impl From<RecordWire> for TrainingRunRecord {
    fn from(w: RecordWire) -> Self {
        let m = w.metrics;
        Self {
            id: w.id,
            started_at: w.started_at,
            status: w.status,
            trigger: w.trigger,
            duration_secs: w.duration_secs,
            metrics_before: ModelQuality {
                map: m.map.before,
                precision: m.precision.before,
                recall: m.recall.before,
                f1_score: m.f1_score.before,
            },
            metrics_after: ModelQuality {
                map: m.map.after,
                precision: m.precision.after,
                recall: m.recall.after,
                f1_score: m.f1_score.after,
            },
            improvement: w.improvement,
            final_loss: w.final_loss,
            synthetic_samples_used: w.synthetic_samples_used,
            epochs: w.epochs,
            learning_rate: w.learning_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic data generation
// ---------------------------------------------------------------------------

/// Randomized augmentation parameters reported by a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationParams {
    /// Brightness multiplier.
    pub brightness: f64,
    /// Contrast multiplier.
    pub contrast: f64,
    /// Rotation in degrees.
    pub rotation: i32,
    /// Scale multiplier.
    pub scale: f64,
    /// Additive noise level.
    pub noise_level: f64,
}

/// Result of a simulated synthetic-data generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Class the samples were generated for.
    pub object_class: SafetyObject,
    /// Number of samples produced.
    pub samples_generated: u32,
    /// Variation tags applied to the samples.
    pub variations_applied: Vec<String>,
    /// Estimated generation time in seconds.
    pub generation_time_secs: f64,
    /// Label format of the generated dataset.
    pub output_format: String,
    /// Augmentation parameters used.
    pub augmentations: AugmentationParams,
    /// Estimated sample quality in `[0.85, 0.98]`.
    pub quality_score: f64,
}
