//! Enumeration types for the Safety Mirror service.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Safety object catalog
// ---------------------------------------------------------------------------

/// A safety-relevant object class the detector knows about.
///
/// Serialized using the human-readable display names the dashboard
/// shows (e.g. `"Fire Extinguisher"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SafetyObject {
    /// Portable fire extinguisher.
    #[serde(rename = "Fire Extinguisher")]
    FireExtinguisher,
    /// Compressed oxygen cylinder.
    #[serde(rename = "Oxygen Tank")]
    OxygenTank,
    /// Compressed nitrogen cylinder.
    #[serde(rename = "Nitrogen Tank")]
    NitrogenTank,
    /// Wall-mounted fire alarm.
    #[serde(rename = "Fire Alarm")]
    FireAlarm,
    /// First aid kit.
    #[serde(rename = "First Aid Box")]
    FirstAidBox,
    /// Electrical safety switch panel.
    #[serde(rename = "Safety Switch Panel")]
    SafetySwitchPanel,
    /// Emergency telephone.
    #[serde(rename = "Emergency Phone")]
    EmergencyPhone,
}

impl SafetyObject {
    /// Every supported class, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::FireExtinguisher,
        Self::OxygenTank,
        Self::NitrogenTank,
        Self::FireAlarm,
        Self::FirstAidBox,
        Self::SafetySwitchPanel,
        Self::EmergencyPhone,
    ];

    /// Display name used on the wire and in the dashboard.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FireExtinguisher => "Fire Extinguisher",
            Self::OxygenTank => "Oxygen Tank",
            Self::NitrogenTank => "Nitrogen Tank",
            Self::FireAlarm => "Fire Alarm",
            Self::FirstAidBox => "First Aid Box",
            Self::SafetySwitchPanel => "Safety Switch Panel",
            Self::EmergencyPhone => "Emergency Phone",
        }
    }
}

impl fmt::Display for SafetyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a catalog class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported object class: {0}")]
pub struct UnknownSafetyObject(pub String);

impl FromStr for SafetyObject {
    type Err = UnknownSafetyObject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|object| object.as_str() == s)
            .ok_or_else(|| UnknownSafetyObject(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Training runs
// ---------------------------------------------------------------------------

/// Outcome of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run finished and its metrics were applied to the model.
    Completed,
    /// The run failed; the model metrics were left untouched.
    Failed,
}

/// Why a retrain run was started.
///
/// Serialized by display name; the `snake_case` forms are accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrainTrigger {
    /// Detection confidence dropped below the alert threshold.
    #[serde(rename = "Low Confidence Alert", alias = "low_confidence_alert")]
    LowConfidenceAlert,
    /// Periodic retraining on a schedule.
    #[serde(rename = "Scheduled Retraining", alias = "scheduled_retraining")]
    ScheduledRetraining,
    /// An operator asked for it.
    #[default]
    #[serde(rename = "Manual Trigger", alias = "manual_trigger")]
    ManualTrigger,
    /// Input distribution drift was detected.
    #[serde(rename = "Drift Detection", alias = "drift_detection")]
    DriftDetection,
}

impl RetrainTrigger {
    /// Human-readable label for logs and the dashboard.
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowConfidenceAlert => "Low Confidence Alert",
            Self::ScheduledRetraining => "Scheduled Retraining",
            Self::ManualTrigger => "Manual Trigger",
            Self::DriftDetection => "Drift Detection",
        }
    }
}
