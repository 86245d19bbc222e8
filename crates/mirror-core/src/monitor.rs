//! The coordinating component that owns all shared service state.
//!
//! [`Monitor`] is created once at startup, wrapped in [`Arc`], and handed
//! to request handlers and broadcast loops. It holds:
//!
//! - the metrics, the detection session flag, and the training history,
//!   together behind one mutex so every read sees a consistent state;
//! - the simulation RNG behind its own mutex (never held together with
//!   the state lock);
//! - the observer registry.
//!
//! Lifecycle events (detection start/stop, retrain completion) are handed
//! to the registry while the state lock is still held. Registry delivery
//! only queues, so this is cheap, and it means observers see lifecycle
//! events in exactly the order the state changes were committed.
//!
//! [`Arc`]: std::sync::Arc

use std::time::Duration;

use chrono::Utc;
use mirror_types::{
    Detection, DetectionUpdate, GenerationResult, MetricsSnapshot, MetricsUpdate, RetrainComplete,
    RunStatus, ServerEvent, SessionState, SessionStatus, TrainingRunRecord,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MirrorConfig;
use crate::detector::DetectionSimulator;
use crate::error::MonitorError;
use crate::history::TrainingHistory;
use crate::metrics::MetricsState;
use crate::pipeline::{PipelineSimulator, RetrainRequest};
use crate::registry::ObserverRegistry;

/// Everything that must change atomically.
#[derive(Debug)]
struct ModelState {
    metrics: MetricsState,
    detection_active: bool,
    history: TrainingHistory,
}

/// Shared service state plus the simulators that act on it.
pub struct Monitor {
    config: MirrorConfig,
    state: Mutex<ModelState>,
    rng: Mutex<StdRng>,
    registry: ObserverRegistry,
    detector: DetectionSimulator,
    pipeline: PipelineSimulator,
}

impl Monitor {
    /// Build the monitor from configuration.
    ///
    /// Uses `pipeline.seed` for the RNG when set, OS entropy otherwise.
    pub fn new(config: MirrorConfig) -> Self {
        let rng = config
            .pipeline
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let metrics = MetricsState::new(
            &config.initial_metrics,
            &config.detection,
            config.pipeline.accuracy_ceiling,
        );
        Self {
            state: Mutex::new(ModelState {
                metrics,
                detection_active: false,
                history: TrainingHistory::new(),
            }),
            rng: Mutex::new(rng),
            registry: ObserverRegistry::new(),
            detector: DetectionSimulator::new(),
            pipeline: PipelineSimulator::new(config.pipeline.clone()),
            config,
        }
    }

    /// The configuration the monitor was built with.
    pub const fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// The connected observers.
    pub const fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    /// Period between snapshot ticks of each broadcast loop.
    pub const fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.config.broadcast.interval_ms)
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    /// Run the detector on a submitted frame and fold the batch into the
    /// metrics.
    pub async fn submit_frame(&self, frame: &[u8]) -> Vec<Detection> {
        let arrived = Instant::now();
        let detections = {
            let mut rng = self.rng.lock().await;
            self.detector.detect(frame, &mut *rng)
        };

        let alert = {
            let mut state = self.state.lock().await;
            state
                .metrics
                .record_batch(&detections, arrived, Utc::now().date_naive())
        };
        if alert {
            warn!(
                threshold = self.config.detection.alert_confidence_threshold,
                "low-confidence detection in frame"
            );
        }
        debug!(frame_bytes = frame.len(), objects = detections.len(), "frame processed");
        detections
    }

    /// Switch the detection session on and notify every observer.
    pub async fn start_detection(&self) {
        self.set_detection(true).await;
    }

    /// Switch the detection session off and notify every observer.
    pub async fn stop_detection(&self) {
        self.set_detection(false).await;
    }

    async fn set_detection(&self, active: bool) {
        let status = SessionStatus {
            status: if active {
                SessionState::Active
            } else {
                SessionState::Inactive
            },
            timestamp: Utc::now(),
        };
        let event = if active {
            ServerEvent::DetectionStarted(status)
        } else {
            ServerEvent::DetectionStopped(status)
        };

        let mut state = self.state.lock().await;
        let was_active = state.detection_active;
        state.detection_active = active;
        let delivered = self.registry.broadcast(event).await;
        info!(active, was_active, delivered, "detection session changed");
    }

    /// Whether detection snapshots are currently streamed.
    pub async fn is_detection_active(&self) -> bool {
        self.state.lock().await.detection_active
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Simulate synthetic data generation. Mutates nothing.
    pub async fn request_generation(
        &self,
        object_class: &str,
        num_samples: u32,
        variations: Option<Vec<String>>,
    ) -> Result<GenerationResult, MonitorError> {
        let result = {
            let mut rng = self.rng.lock().await;
            self.pipeline
                .generate(object_class, num_samples, variations, &mut *rng)?
        };
        info!(
            object_class = %result.object_class,
            samples = result.samples_generated,
            quality = result.quality_score,
            "synthetic data generated"
        );
        Ok(result)
    }

    /// Simulate a retrain run and commit it.
    ///
    /// The run is appended to the history (and, if it completed, its
    /// metrics applied) before `retrain_complete` is broadcast.
    pub async fn request_retrain(
        &self,
        request: RetrainRequest,
    ) -> Result<TrainingRunRecord, MonitorError> {
        let plan = {
            let mut rng = self.rng.lock().await;
            self.pipeline.plan_run(&request, &mut *rng)?
        };
        debug!(
            epochs = plan.epochs(),
            trigger = request.trigger.label(),
            fault = plan.failed(),
            "retrain planned"
        );

        if let Some(delay) = self.pipeline.epoch_delay() {
            for _ in 0..plan.epochs() {
                tokio::time::sleep(delay).await;
            }
        }

        let ceiling = self.pipeline.accuracy_ceiling();
        let mut state = self.state.lock().await;
        let before = state.metrics.quality();
        let record = state
            .history
            .append(|id| plan.into_record(id, before, ceiling));
        if record.status == RunStatus::Completed {
            state.metrics.apply_quality(&record.metrics_after);
        }

        let event = ServerEvent::RetrainComplete(RetrainComplete {
            record: record.clone(),
            timestamp: Utc::now(),
        });
        let delivered = self.registry.broadcast(event).await;
        drop(state);

        match record.status {
            RunStatus::Completed => info!(
                run = %record.id,
                map_before = record.metrics_before.map,
                map_after = record.metrics_after.map,
                epochs = record.epochs,
                trigger = record.trigger.label(),
                delivered,
                "retrain completed"
            ),
            RunStatus::Failed => warn!(run = %record.id, delivered, "retrain failed"),
        }
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current metrics.
    pub async fn query_metrics(&self) -> MetricsSnapshot {
        self.state.lock().await.metrics.snapshot()
    }

    /// Training history, most recent first.
    pub async fn query_history(&self) -> Vec<TrainingRunRecord> {
        self.state.lock().await.history.recent_first()
    }

    /// Events one broadcast tick emits, in emission order.
    ///
    /// A `detection_update` (only while detection is active) followed by
    /// a `metrics_update`. Both carry the same metrics snapshot.
    pub async fn tick_events(&self) -> Vec<ServerEvent> {
        let (active, metrics) = {
            let state = self.state.lock().await;
            (state.detection_active, state.metrics.snapshot())
        };

        let mut events = Vec::with_capacity(2);
        if active {
            let detections = {
                let mut rng = self.rng.lock().await;
                self.detector.detect(&[], &mut *rng)
            };
            events.push(ServerEvent::DetectionUpdate(DetectionUpdate {
                detections,
                metrics: metrics.clone(),
                timestamp: Utc::now(),
            }));
        }
        events.push(ServerEvent::MetricsUpdate(MetricsUpdate {
            metrics,
            timestamp: Utc::now(),
        }));
        events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use mirror_types::{RetrainTrigger, TrainingRunId};

    use super::*;
    use crate::config::PipelineConfig;

    fn seeded(seed: u64) -> MirrorConfig {
        MirrorConfig {
            pipeline: PipelineConfig {
                seed: Some(seed),
                ..PipelineConfig::default()
            },
            ..MirrorConfig::default()
        }
    }

    #[tokio::test]
    async fn detection_flag_defaults_inactive() {
        let monitor = Monitor::new(seeded(1));
        assert!(!monitor.is_detection_active().await);
        monitor.start_detection().await;
        assert!(monitor.is_detection_active().await);
        monitor.stop_detection().await;
        assert!(!monitor.is_detection_active().await);
    }

    #[tokio::test]
    async fn submit_frame_updates_metrics() {
        let monitor = Monitor::new(seeded(2));
        let detections = monitor.submit_frame(b"jpeg bytes").await;
        let metrics = monitor.query_metrics().await;
        assert_eq!(
            metrics.objects_detected_last_batch,
            u32::try_from(detections.len()).unwrap()
        );
        let mean: f64 = detections.iter().map(|d| d.confidence).sum::<f64>()
            / f64::from(u32::try_from(detections.len()).unwrap());
        assert!((metrics.mean_confidence - mean * 100.0).abs() < 1e-9);
        assert_eq!(metrics.frames_processed, 1);
    }

    #[tokio::test]
    async fn retrain_from_default_accuracy() {
        let monitor = Monitor::new(seeded(3));
        let before = monitor.query_metrics().await.accuracy;
        assert!((before - 95.7).abs() < f64::EPSILON);

        let record = monitor
            .request_retrain(RetrainRequest::new(1000))
            .await
            .unwrap();

        assert!(record.metrics_after.map >= 95.7);
        assert!(record.metrics_after.map <= 99.0);
        assert_eq!(record.synthetic_samples_used, 1000);
        assert_eq!(monitor.query_history().await.len(), 1);
        let after = monitor.query_metrics().await.accuracy;
        assert!((after - record.metrics_after.map).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn repeated_retrains_never_lower_accuracy() {
        let monitor = Monitor::new(seeded(4));
        let mut last = monitor.query_metrics().await.accuracy;
        for _ in 0..10 {
            monitor
                .request_retrain(RetrainRequest::new(500))
                .await
                .unwrap();
            let now = monitor.query_metrics().await.accuracy;
            assert!(now >= last);
            assert!(now <= 99.0);
            last = now;
        }
        let history = monitor.query_history().await;
        let ids: Vec<u64> = history.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, (1..=10).rev().collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn unsupported_class_mutates_nothing() {
        let monitor = Monitor::new(seeded(5));
        let before = monitor.query_metrics().await;
        let result = monitor
            .request_generation("Not A Real Object", 10, None)
            .await;
        assert!(matches!(result, Err(MonitorError::UnsupportedClass { .. })));
        assert_eq!(monitor.query_metrics().await, before);
        assert!(monitor.query_history().await.is_empty());
    }

    #[tokio::test]
    async fn failed_run_is_recorded_without_touching_metrics() {
        let mut config = seeded(6);
        config.pipeline.failure_rate = 1.0;
        let monitor = Monitor::new(config);
        let before = monitor.query_metrics().await;
        let record = monitor
            .request_retrain(RetrainRequest {
                trigger: RetrainTrigger::ScheduledRetraining,
                ..RetrainRequest::new(800)
            })
            .await
            .unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(monitor.query_metrics().await, before);
        assert_eq!(monitor.query_history().await.len(), 1);
    }

    #[tokio::test]
    async fn retrain_is_broadcast_after_append() {
        let monitor = Monitor::new(seeded(7));
        let (_id, mut rx) = monitor.registry().register_channel().await;
        let record = monitor
            .request_retrain(RetrainRequest::new(1000))
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            ServerEvent::RetrainComplete(payload) if payload.record == record
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_retrains_get_unique_sequential_ids() {
        let monitor = Arc::new(Monitor::new(seeded(8)));
        let (_id, mut rx) = monitor.registry().register_channel().await;

        let mut tasks = Vec::new();
        for _ in 0..25 {
            let monitor = Arc::clone(&monitor);
            tasks.push(tokio::spawn(async move {
                monitor
                    .request_retrain(RetrainRequest::new(100))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = BTreeSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        let expected: BTreeSet<TrainingRunId> = (1..=25).map(TrainingRunId).collect();
        assert_eq!(ids, expected);

        // Broadcast order matches commit order.
        let mut broadcast_ids = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::RetrainComplete(payload) = event.as_ref() {
                broadcast_ids.push(payload.record.id.0);
            }
        }
        assert_eq!(broadcast_ids, (1..=25).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn tick_events_follow_session_flag() {
        let monitor = Monitor::new(seeded(9));
        let kinds: Vec<&str> = monitor
            .tick_events()
            .await
            .iter()
            .map(ServerEvent::kind)
            .collect();
        assert_eq!(kinds, vec!["metrics_update"]);

        monitor.start_detection().await;
        let kinds: Vec<&str> = monitor
            .tick_events()
            .await
            .iter()
            .map(ServerEvent::kind)
            .collect();
        assert_eq!(kinds, vec!["detection_update", "metrics_update"]);
    }

    #[tokio::test(start_paused = true)]
    async fn epoch_pacing_sleeps_per_epoch() {
        let mut config = seeded(10);
        config.pipeline.epoch_delay_ms = 100;
        let monitor = Monitor::new(config);
        let started = Instant::now();
        monitor
            .request_retrain(RetrainRequest {
                epochs: Some(5),
                ..RetrainRequest::new(10)
            })
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
