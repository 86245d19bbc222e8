//! Synthetic data generation and retraining simulator.
//!
//! Two independent stages:
//!
//! - [`PipelineSimulator::generate`] validates the object class and
//!   reports a plausible generation result. Nothing is written anywhere.
//! - [`PipelineSimulator::plan_run`] simulates the epoch loop of a
//!   retrain run and draws every random quantity the run needs. The
//!   resulting [`RunPlan`] is committed later, under the monitor's state
//!   lock, against whatever metrics are current at that moment. Drawing
//!   first and committing later keeps the random work and any epoch
//!   pacing outside the lock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mirror_types::{
    AugmentationParams, GenerationResult, ModelQuality, RetrainTrigger, RunStatus, SafetyObject,
    TrainingRunId, TrainingRunRecord,
};
use rand::Rng;

use crate::config::PipelineConfig;
use crate::error::MonitorError;

/// Variation tags applied when a generation request names none.
pub const DEFAULT_VARIATIONS: [&str; 5] = ["lighting", "rotation", "occlusion", "noise", "background"];

/// Upper bound on epochs a single request may ask for.
pub const MAX_EPOCHS: u32 = 1_000;

/// Per-epoch figures of a simulated training loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// One-based epoch number.
    pub epoch: u32,
    /// Training loss.
    pub loss: f64,
    /// Validation `mAP` as a fraction.
    pub map: f64,
}

/// Parameters of one retrain request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrainRequest {
    /// Synthetic samples fed to the run.
    pub samples_used: u64,
    /// Epochs to train; the configured default when `None`.
    pub epochs: Option<u32>,
    /// Learning rate; the configured default when `None`.
    pub learning_rate: Option<f64>,
    /// Why the run was requested.
    pub trigger: RetrainTrigger,
}

impl RetrainRequest {
    /// A manual run with default epochs and learning rate.
    pub const fn new(samples_used: u64) -> Self {
        Self {
            samples_used,
            epochs: None,
            learning_rate: None,
            trigger: RetrainTrigger::ManualTrigger,
        }
    }
}

/// Improvements drawn for each quality metric, in percentage points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QualityGains {
    map: f64,
    precision: f64,
    recall: f64,
    f1_score: f64,
}

/// A fully simulated retrain run waiting to be committed.
#[derive(Debug, Clone)]
pub struct RunPlan {
    started_at: DateTime<Utc>,
    trigger: RetrainTrigger,
    samples_used: u64,
    epochs: u32,
    learning_rate: f64,
    duration_secs: f64,
    curve: Vec<EpochStats>,
    gains: QualityGains,
    failed: bool,
}

impl RunPlan {
    /// Whether the injected fault fired for this run.
    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// The simulated epoch loop.
    #[cfg(test)]
    pub fn curve(&self) -> &[EpochStats] {
        &self.curve
    }

    /// Number of epochs the run trains for.
    pub const fn epochs(&self) -> u32 {
        self.epochs
    }

    /// Build the history record for this run.
    ///
    /// `before` is the model quality at commit time. A completed run
    /// raises every metric by its drawn gain, capped at `ceiling` and
    /// never below `before`. A failed run leaves the metrics unchanged.
    pub fn into_record(self, id: TrainingRunId, before: ModelQuality, ceiling: f64) -> TrainingRunRecord {
        let (status, after) = if self.failed {
            (RunStatus::Failed, before)
        } else {
            let after = ModelQuality {
                map: improve(before.map, self.gains.map, ceiling),
                precision: improve(before.precision, self.gains.precision, ceiling),
                recall: improve(before.recall, self.gains.recall, ceiling),
                f1_score: improve(before.f1_score, self.gains.f1_score, ceiling),
            };
            (RunStatus::Completed, after)
        };

        TrainingRunRecord {
            id,
            started_at: self.started_at,
            status,
            trigger: self.trigger,
            duration_secs: self.duration_secs,
            metrics_before: before,
            metrics_after: after,
            improvement: after.map - before.map,
            final_loss: self.curve.last().map_or(0.0, |e| e.loss),
            synthetic_samples_used: self.samples_used,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
        }
    }
}

/// Raise `before` by `gain` without exceeding `ceiling` or going down.
fn improve(before: f64, gain: f64, ceiling: f64) -> f64 {
    (before + gain).min(ceiling).max(before)
}

/// Generation and retraining simulator.
#[derive(Debug, Clone)]
pub struct PipelineSimulator {
    config: PipelineConfig,
}

impl PipelineSimulator {
    /// Create a simulator with the given settings.
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Quality metric ceiling, in percent.
    pub const fn accuracy_ceiling(&self) -> f64 {
        self.config.accuracy_ceiling
    }

    /// Real delay between simulated epochs, if pacing is enabled.
    pub const fn epoch_delay(&self) -> Option<Duration> {
        match self.config.epoch_delay_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Simulate synthetic data generation for one object class.
    ///
    /// Fails with [`MonitorError::UnsupportedClass`] when the class is
    /// not in the catalog.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        object_class: &str,
        num_samples: u32,
        variations: Option<Vec<String>>,
        rng: &mut R,
    ) -> Result<GenerationResult, MonitorError> {
        let object_class: SafetyObject = object_class.parse()?;
        if num_samples == 0 {
            return Err(MonitorError::InvalidRequest(String::from(
                "num_samples must be greater than zero",
            )));
        }

        let variations_applied = variations
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VARIATIONS.iter().map(|v| (*v).to_owned()).collect());

        Ok(GenerationResult {
            object_class,
            samples_generated: num_samples,
            variations_applied,
            generation_time_secs: rng.random_range(2.0..=8.0),
            output_format: String::from("YOLO format"),
            augmentations: AugmentationParams {
                brightness: rng.random_range(0.8..=1.2),
                contrast: rng.random_range(0.8..=1.2),
                rotation: rng.random_range(-30..=30),
                scale: rng.random_range(0.8..=1.2),
                noise_level: rng.random_range(0.0..=0.1),
            },
            quality_score: rng.random_range(0.85..=0.98),
        })
    }

    /// Simulate the training loop of a retrain run.
    ///
    /// Draws the epoch curve, the simulated duration, the metric gains,
    /// and whether the injected fault fires. Touches no shared state.
    pub fn plan_run<R: Rng + ?Sized>(
        &self,
        request: &RetrainRequest,
        rng: &mut R,
    ) -> Result<RunPlan, MonitorError> {
        let epochs = request.epochs.unwrap_or(self.config.default_epochs);
        if epochs == 0 || epochs > MAX_EPOCHS {
            return Err(MonitorError::InvalidRequest(format!(
                "epochs must be between 1 and {MAX_EPOCHS}, got {epochs}"
            )));
        }
        let learning_rate = request
            .learning_rate
            .unwrap_or(self.config.default_learning_rate);
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(MonitorError::InvalidRequest(format!(
                "learning_rate must be a positive number, got {learning_rate}"
            )));
        }

        let failed = self.config.failure_rate > 0.0
            && rng.random_bool(self.config.failure_rate.clamp(0.0, 1.0));

        Ok(RunPlan {
            started_at: Utc::now(),
            trigger: request.trigger,
            samples_used: request.samples_used,
            epochs,
            learning_rate,
            duration_secs: rng.random_range(600.0..=1200.0),
            curve: simulate_epochs(epochs, rng),
            gains: QualityGains {
                map: rng.random_range(1.0..=4.0),
                precision: rng.random_range(0.5..=3.0),
                recall: rng.random_range(0.5..=3.0),
                f1_score: rng.random_range(0.5..=3.0),
            },
            failed,
        })
    }
}

/// Noisy training curve: loss trends down, `mAP` trends up with progress.
pub fn simulate_epochs<R: Rng + ?Sized>(epochs: u32, rng: &mut R) -> Vec<EpochStats> {
    let total = f64::from(epochs.max(1));
    (0..epochs)
        .map(|e| {
            let progress = f64::from(e) / total;
            EpochStats {
                epoch: e.saturating_add(1),
                loss: rng.random_range(0.1..=0.5) * (1.0 - progress),
                map: rng.random_range(0.80..=0.95) + progress * 0.05,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn quality(map: f64) -> ModelQuality {
        ModelQuality {
            map,
            precision: 90.0,
            recall: 88.0,
            f1_score: 89.0,
        }
    }

    fn simulator() -> PipelineSimulator {
        PipelineSimulator::new(PipelineConfig::default())
    }

    #[test]
    fn generate_rejects_unknown_class() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = simulator().generate("Not A Real Object", 10, None, &mut rng);
        assert!(matches!(
            result,
            Err(MonitorError::UnsupportedClass { ref class }) if class == "Not A Real Object"
        ));
    }

    #[test]
    fn generate_defaults_variations() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = simulator()
            .generate("Oxygen Tank", 250, None, &mut rng)
            .unwrap();
        assert_eq!(result.object_class, SafetyObject::OxygenTank);
        assert_eq!(result.samples_generated, 250);
        assert_eq!(result.variations_applied.len(), DEFAULT_VARIATIONS.len());
        assert!((0.85..=0.98).contains(&result.quality_score));
        assert!((2.0..=8.0).contains(&result.generation_time_secs));
        assert!((-30..=30).contains(&result.augmentations.rotation));
    }

    #[test]
    fn generate_keeps_given_variations() {
        let mut rng = StdRng::seed_from_u64(2);
        let result = simulator()
            .generate("Fire Alarm", 5, Some(vec![String::from("glare")]), &mut rng)
            .unwrap();
        assert_eq!(result.variations_applied, vec![String::from("glare")]);
    }

    #[test]
    fn generate_rejects_zero_samples() {
        let mut rng = StdRng::seed_from_u64(2);
        let result = simulator().generate("Fire Alarm", 0, None, &mut rng);
        assert!(matches!(result, Err(MonitorError::InvalidRequest(_))));
    }

    #[test]
    fn epoch_curve_trends() {
        let mut rng = StdRng::seed_from_u64(11);
        let curve = simulate_epochs(20, &mut rng);
        assert_eq!(curve.len(), 20);
        assert_eq!(curve.first().map(|e| e.epoch), Some(1));
        let last = curve.last().unwrap();
        assert!(last.loss <= 0.5 / 20.0 + 1e-12);
        for stats in &curve {
            assert!(stats.loss >= 0.0);
            assert!((0.80..=1.0).contains(&stats.map));
        }
    }

    #[test]
    fn completed_run_improves_within_ceiling() {
        let sim = simulator();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = sim.plan_run(&RetrainRequest::new(1000), &mut rng).unwrap();
            let record = plan.into_record(TrainingRunId::FIRST, quality(95.7), 99.0);
            assert_eq!(record.status, RunStatus::Completed);
            assert!(record.metrics_after.map >= 95.7);
            assert!(record.metrics_after.map <= 99.0);
            assert!(record.metrics_after.precision >= 90.0);
            assert!(record.improvement >= 0.0);
            assert_eq!(record.epochs, 20);
            assert!((600.0..=1200.0).contains(&record.duration_secs));
        }
    }

    #[test]
    fn at_ceiling_stays_at_ceiling() {
        let mut rng = StdRng::seed_from_u64(4);
        let plan = simulator()
            .plan_run(&RetrainRequest::new(10), &mut rng)
            .unwrap();
        let record = plan.into_record(TrainingRunId::FIRST, quality(99.0), 99.0);
        assert!((record.metrics_after.map - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn injected_failure_keeps_metrics() {
        let config = PipelineConfig {
            failure_rate: 1.0,
            ..PipelineConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let plan = PipelineSimulator::new(config)
            .plan_run(&RetrainRequest::new(10), &mut rng)
            .unwrap();
        assert!(plan.failed());
        let record = plan.into_record(TrainingRunId::FIRST, quality(95.7), 99.0);
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.metrics_after, record.metrics_before);
        assert!(record.improvement.abs() < f64::EPSILON);
    }

    #[test]
    fn request_overrides_defaults() {
        let mut rng = StdRng::seed_from_u64(8);
        let request = RetrainRequest {
            samples_used: 42,
            epochs: Some(5),
            learning_rate: Some(0.01),
            trigger: RetrainTrigger::DriftDetection,
        };
        let plan = simulator().plan_run(&request, &mut rng).unwrap();
        assert_eq!(plan.curve().len(), 5);
        assert_eq!(plan.epochs(), 5);
        let record = plan.into_record(TrainingRunId(3), quality(90.0), 99.0);
        assert_eq!(record.synthetic_samples_used, 42);
        assert_eq!(record.trigger, RetrainTrigger::DriftDetection);
        assert!((record.learning_rate - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let mut rng = StdRng::seed_from_u64(8);
        let zero_epochs = RetrainRequest {
            epochs: Some(0),
            ..RetrainRequest::new(1)
        };
        assert!(simulator().plan_run(&zero_epochs, &mut rng).is_err());
        let bad_rate = RetrainRequest {
            learning_rate: Some(-1.0),
            ..RetrainRequest::new(1)
        };
        assert!(simulator().plan_run(&bad_rate, &mut rng).is_err());
    }

    #[test]
    fn pacing_disabled_by_default() {
        assert!(simulator().epoch_delay().is_none());
        let paced = PipelineSimulator::new(PipelineConfig {
            epoch_delay_ms: 5,
            ..PipelineConfig::default()
        });
        assert_eq!(paced.epoch_delay(), Some(Duration::from_millis(5)));
    }
}
