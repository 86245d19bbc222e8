//! Rolling model performance counters.
//!
//! [`MetricsState`] is the mutable record behind every metrics snapshot.
//! It is not synchronized by itself; the [`Monitor`](crate::monitor::Monitor)
//! keeps it behind the same lock as the detection flag and the training
//! history so readers never see a half-applied update.

use std::collections::VecDeque;

use chrono::NaiveDate;
use mirror_types::{Detection, MetricsSnapshot, ModelQuality, clamp_percent};
use tokio::time::Instant;

use crate::config::{DetectionConfig, InitialMetrics};

/// Process-lifetime performance counters.
#[derive(Debug, Clone)]
pub struct MetricsState {
    current: MetricsSnapshot,
    frame_rate: FrameRateMeter,
    alert_threshold: f64,
    alerts_day: Option<NaiveDate>,
}

impl MetricsState {
    /// Build the starting metrics from configuration.
    ///
    /// Percentages are clamped into `[0, 100]` and accuracy is capped at
    /// `accuracy_ceiling`.
    pub fn new(initial: &InitialMetrics, detection: &DetectionConfig, accuracy_ceiling: f64) -> Self {
        Self {
            current: MetricsSnapshot {
                accuracy: clamp_percent(initial.accuracy).min(accuracy_ceiling),
                mean_confidence: clamp_percent(initial.confidence),
                frames_per_second: initial.fps.max(0.0),
                objects_detected_last_batch: initial.objects_detected,
                alerts_today: initial.alerts_today,
                precision: clamp_percent(initial.precision).min(accuracy_ceiling),
                recall: clamp_percent(initial.recall).min(accuracy_ceiling),
                f1_score: clamp_percent(initial.f1_score).min(accuracy_ceiling),
                frames_processed: 0,
            },
            frame_rate: FrameRateMeter::new(detection.fps_window),
            alert_threshold: detection.alert_confidence_threshold,
            alerts_day: None,
        }
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.current.clone()
    }

    /// Current model quality figures.
    pub const fn quality(&self) -> ModelQuality {
        self.current.quality()
    }

    /// Current `mAP` percentage.
    #[cfg(test)]
    pub const fn accuracy(&self) -> f64 {
        self.current.accuracy
    }

    /// Fold a completed detection batch into the counters.
    ///
    /// Updates mean confidence, object count, frame count, and the
    /// rolling frame rate. Returns `true` when the batch raised a
    /// low-confidence alert.
    pub fn record_batch(&mut self, detections: &[Detection], arrived: Instant, today: NaiveDate) -> bool {
        self.current.frames_processed = self.current.frames_processed.saturating_add(1);
        self.current.objects_detected_last_batch =
            u32::try_from(detections.len()).unwrap_or(u32::MAX);

        if let Some(mean) = mean_confidence(detections) {
            self.current.mean_confidence = clamp_percent(mean * 100.0);
        }

        if let Some(fps) = self.frame_rate.record(arrived) {
            self.current.frames_per_second = fps;
        }

        if self.alerts_day != Some(today) {
            // The configured starting count belongs to the first day seen.
            if self.alerts_day.is_some() {
                self.current.alerts_today = 0;
            }
            self.alerts_day = Some(today);
        }

        let alert = detections
            .iter()
            .any(|d| d.confidence < self.alert_threshold);
        if alert {
            self.current.alerts_today = self.current.alerts_today.saturating_add(1);
        }
        alert
    }

    /// Replace the model quality figures after a completed retrain run.
    pub fn apply_quality(&mut self, quality: &ModelQuality) {
        self.current.accuracy = clamp_percent(quality.map);
        self.current.precision = clamp_percent(quality.precision);
        self.current.recall = clamp_percent(quality.recall);
        self.current.f1_score = clamp_percent(quality.f1_score);
    }
}

/// Arithmetic mean of the batch confidences, `None` for an empty batch.
fn mean_confidence(detections: &[Detection]) -> Option<f64> {
    let count = u32::try_from(detections.len()).ok().filter(|n| *n > 0)?;
    let sum: f64 = detections.iter().map(|d| d.confidence).sum();
    Some(sum / f64::from(count))
}

/// Frame rate over the most recent arrivals.
#[derive(Debug, Clone)]
struct FrameRateMeter {
    arrivals: VecDeque<Instant>,
    window: usize,
}

impl FrameRateMeter {
    fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            arrivals: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record an arrival and return the current rate once two or more
    /// arrivals span a non-zero interval.
    fn record(&mut self, at: Instant) -> Option<f64> {
        if self.arrivals.len() >= self.window {
            self.arrivals.pop_front();
        }
        self.arrivals.push_back(at);

        let first = self.arrivals.front()?;
        let last = self.arrivals.back()?;
        let span = last.saturating_duration_since(*first).as_secs_f64();
        let intervals = u32::try_from(self.arrivals.len().saturating_sub(1)).ok()?;
        (intervals > 0 && span > 0.0).then(|| f64::from(intervals) / span)
    }
}
