//! Stub object detector.
//!
//! Produces one detection per catalog class from a fixed scene fixture,
//! with small random jitter on confidence and box position. The frame
//! payload is not inspected: an empty payload yields the same set as a
//! real image. Absence and occlusion are not modelled.

use chrono::Utc;
use mirror_types::{BoundingBox, Detection, SafetyObject};
use rand::Rng;
use tracing::trace;

/// Lowest confidence the simulator reports.
pub const MIN_CONFIDENCE: f64 = 0.75;

/// Highest confidence the simulator reports.
pub const MAX_CONFIDENCE: f64 = 0.98;

/// Maximum confidence change per call, in either direction.
const CONFIDENCE_JITTER: f64 = 0.05;

/// Maximum box offset per call on x and y, in pixels.
const POSITION_JITTER: i32 = 3;

/// A canned sighting the simulator perturbs on every call.
#[derive(Debug, Clone, Copy)]
struct Fixture {
    class: SafetyObject,
    confidence: f64,
    bbox: BoundingBox,
}

/// The demo scene: one stable sighting per catalog class.
const SCENE: [Fixture; 7] = [
    Fixture {
        class: SafetyObject::FireExtinguisher,
        confidence: 0.94,
        bbox: BoundingBox::new(120, 80, 80, 120),
    },
    Fixture {
        class: SafetyObject::OxygenTank,
        confidence: 0.87,
        bbox: BoundingBox::new(300, 150, 60, 100),
    },
    Fixture {
        class: SafetyObject::NitrogenTank,
        confidence: 0.88,
        bbox: BoundingBox::new(560, 160, 55, 105),
    },
    Fixture {
        class: SafetyObject::FireAlarm,
        confidence: 0.91,
        bbox: BoundingBox::new(500, 80, 35, 40),
    },
    Fixture {
        class: SafetyObject::FirstAidBox,
        confidence: 0.92,
        bbox: BoundingBox::new(450, 200, 70, 50),
    },
    Fixture {
        class: SafetyObject::SafetySwitchPanel,
        confidence: 0.89,
        bbox: BoundingBox::new(200, 300, 40, 60),
    },
    Fixture {
        class: SafetyObject::EmergencyPhone,
        confidence: 0.85,
        bbox: BoundingBox::new(380, 120, 45, 65),
    },
];

/// Fake detector over the fixed safety-object scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSimulator;

impl DetectionSimulator {
    /// Create the simulator.
    pub const fn new() -> Self {
        Self
    }

    /// Number of detections every call returns.
    #[cfg(test)]
    pub const fn batch_size(self) -> usize {
        SCENE.len()
    }

    /// Simulate detection on a frame.
    ///
    /// Returns one detection per catalog class in a stable order.
    /// Confidences stay within [`MIN_CONFIDENCE`, `MAX_CONFIDENCE`] and
    /// box components never go below zero.
    pub fn detect<R: Rng + ?Sized>(self, frame: &[u8], rng: &mut R) -> Vec<Detection> {
        trace!(frame_bytes = frame.len(), "simulating detection");
        let observed_at = Utc::now();

        SCENE
            .iter()
            .map(|fixture| {
                let jitter = rng.random_range(-CONFIDENCE_JITTER..=CONFIDENCE_JITTER);
                let confidence = (fixture.confidence + jitter).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);

                let dx = rng.random_range(-POSITION_JITTER..=POSITION_JITTER);
                let dy = rng.random_range(-POSITION_JITTER..=POSITION_JITTER);
                let bbox = BoundingBox {
                    x: fixture.bbox.x.saturating_add_signed(dx),
                    y: fixture.bbox.y.saturating_add_signed(dy),
                    ..fixture.bbox
                };

                Detection {
                    class_name: fixture.class,
                    confidence,
                    bbox,
                    observed_at,
                }
            })
            .collect()
    }
}
