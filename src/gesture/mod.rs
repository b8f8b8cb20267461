//! Hand gesture pipeline
//!
//! Landmark frame -> [`PoseSummary`] (normalizer) -> [`Gesture`] (classifier).
//! Runs once per camera frame, independently of the render loop.

pub mod classifier;
pub mod landmarks;
pub mod source;
pub mod synthetic;

pub use classifier::{FingerMetrics, Gesture, GestureClassifier, GestureThresholds};
pub use landmarks::{normalize, Landmark, PoseSummary, LANDMARK_COUNT};
pub use source::{DetectionError, GestureInput, LandmarkSource, ScriptedSource, SimulatedHand};

/// Normalizer and classifier run back to back on the same frame
#[derive(Clone, Debug, Default)]
pub struct HandPipeline {
    classifier: GestureClassifier,
}

impl HandPipeline {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            classifier: GestureClassifier::new(thresholds),
        }
    }

    pub fn process(&self, frame: Option<&[Landmark]>) -> PoseSummary {
        let mut pose = normalize(frame);
        if pose.is_detected {
            if let Some(points) = frame {
                pose.gesture = self.classifier.classify(points);
            }
        }
        pose
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }
}
