//! Configuration loading and typed config structures for the Safety Mirror
//! service.
//!
//! The canonical configuration lives in `mirror-config.yaml` at the project
//! root. Every field has a default, so an empty (or missing) file yields a
//! working demo setup.

use std::path::Path;

use serde::Deserialize;

use crate::pipeline::MAX_EPOCHS;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `mirror-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MirrorConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Observer push loop settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Detection simulator settings.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Generation and retraining simulator settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Metric values at process start.
    #[serde(default)]
    pub initial_metrics: InitialMetrics,
}

impl MirrorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `MIRROR_HOST` overrides `server.host`
    /// - `MIRROR_PORT` overrides `server.port`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast.interval_ms",
                reason: String::from("must be greater than zero"),
            });
        }
        let ceiling = self.pipeline.accuracy_ceiling;
        if !(ceiling > 0.0 && ceiling <= 100.0) {
            return Err(ConfigError::Invalid {
                field: "pipeline.accuracy_ceiling",
                reason: format!("{ceiling} is outside (0, 100]"),
            });
        }
        let rate = self.pipeline.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Invalid {
                field: "pipeline.failure_rate",
                reason: format!("{rate} is outside [0, 1]"),
            });
        }
        let epochs = self.pipeline.default_epochs;
        if epochs == 0 || epochs > MAX_EPOCHS {
            return Err(ConfigError::Invalid {
                field: "pipeline.default_epochs",
                reason: format!("{epochs} is outside [1, {MAX_EPOCHS}]"),
            });
        }
        let threshold = self.detection.alert_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                field: "detection.alert_confidence_threshold",
                reason: format!("{threshold} is outside [0, 1]"),
            });
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServerSettings {
    /// Apply `MIRROR_HOST` / `MIRROR_PORT` if set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("MIRROR_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("MIRROR_PORT") {
            self.port = val.parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("MIRROR_PORT={val}: {e}"),
            })?;
        }
        Ok(())
    }
}

/// Observer push loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Milliseconds between periodic snapshots.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// Detection simulator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionConfig {
    /// A batch containing any detection below this confidence raises an alert.
    #[serde(default = "default_alert_confidence_threshold")]
    pub alert_confidence_threshold: f64,

    /// Number of recent frame arrivals used for the rolling frame rate.
    #[serde(default = "default_fps_window")]
    pub fps_window: usize,

    /// Model version reported with detection results.
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            alert_confidence_threshold: default_alert_confidence_threshold(),
            fps_window: default_fps_window(),
            model_version: default_model_version(),
        }
    }
}

/// Generation and retraining simulator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Epochs used when a retrain request does not specify any.
    #[serde(default = "default_epochs")]
    pub default_epochs: u32,

    /// Learning rate used when a retrain request does not specify one.
    #[serde(default = "default_learning_rate")]
    pub default_learning_rate: f64,

    /// No quality metric is ever raised above this percentage.
    #[serde(default = "default_accuracy_ceiling")]
    pub accuracy_ceiling: f64,

    /// Probability that a retrain run fails. Zero disables failures.
    #[serde(default)]
    pub failure_rate: f64,

    /// Real milliseconds slept between simulated epochs.
    #[serde(default)]
    pub epoch_delay_ms: u64,

    /// Seed for the simulation RNG. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_epochs: default_epochs(),
            default_learning_rate: default_learning_rate(),
            accuracy_ceiling: default_accuracy_ceiling(),
            failure_rate: 0.0,
            epoch_delay_ms: 0,
            seed: None,
        }
    }
}

/// Metric values the service starts with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitialMetrics {
    /// Starting `mAP` percentage.
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    /// Starting mean confidence percentage.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Starting frame rate shown before any frame arrives.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Starting object count.
    #[serde(default = "default_objects_detected")]
    pub objects_detected: u32,
    /// Starting alert count.
    #[serde(default = "default_alerts_today")]
    pub alerts_today: u32,
    /// Starting precision percentage.
    #[serde(default = "default_precision")]
    pub precision: f64,
    /// Starting recall percentage.
    #[serde(default = "default_recall")]
    pub recall: f64,
    /// Starting F1 percentage.
    #[serde(default = "default_f1_score")]
    pub f1_score: f64,
}

impl Default for InitialMetrics {
    fn default() -> Self {
        Self {
            accuracy: default_accuracy(),
            confidence: default_confidence(),
            fps: default_fps(),
            objects_detected: default_objects_detected(),
            alerts_today: default_alerts_today(),
            precision: default_precision(),
            recall: default_recall(),
            f1_score: default_f1_score(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_owned(),
        "http://127.0.0.1:3000".to_owned(),
    ]
}

const fn default_interval_ms() -> u64 {
    2_000
}

const fn default_alert_confidence_threshold() -> f64 {
    0.80
}

const fn default_fps_window() -> usize {
    30
}

fn default_model_version() -> String {
    "YOLOv8n-safety-v1.2".to_owned()
}

const fn default_epochs() -> u32 {
    20
}

const fn default_learning_rate() -> f64 {
    0.001
}

const fn default_accuracy_ceiling() -> f64 {
    99.0
}

const fn default_accuracy() -> f64 {
    95.7
}

const fn default_confidence() -> f64 {
    87.3
}

const fn default_fps() -> f64 {
    24.0
}

const fn default_objects_detected() -> u32 {
    12
}

const fn default_alerts_today() -> u32 {
    3
}

const fn default_precision() -> f64 {
    90.1
}

const fn default_recall() -> f64 {
    88.4
}

const fn default_f1_score() -> f64 {
    89.2
}
