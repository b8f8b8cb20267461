//! Gesture Classifier
//!
//! Maps fingertip/wrist geometry to one of five discrete gestures. Rules are
//! checked in a fixed priority order because their ranges overlap:
//! FIST, then YEAH, then PINCH, then OPEN_PALM, otherwise NONE.

use serde::{Deserialize, Serialize};

use super::landmarks::{index, Landmark, LANDMARK_COUNT};

/// A discrete hand gesture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    #[default]
    None,
    Fist,
    OpenPalm,
    Pinch,
    Yeah,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::None,
        Gesture::Fist,
        Gesture::OpenPalm,
        Gesture::Pinch,
        Gesture::Yeah,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Gesture::None => "None",
            Gesture::Fist => "Fist",
            Gesture::OpenPalm => "Open palm",
            Gesture::Pinch => "Pinch",
            Gesture::Yeah => "Yeah",
        }
    }
}

/// Geometric thresholds, in normalized image units.
///
/// Tuned empirically against a single webcam setup, so they live in the
/// config file rather than in code.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Average fingertip distance below which the hand is a fist
    pub fist_max_avg: f32,
    /// Index and middle tips must be farther than this for YEAH
    pub yeah_extended_min: f32,
    /// Ring and pinky tips must be closer than this for YEAH
    pub yeah_curled_max: f32,
    /// Thumb-to-index distance below which the hand pinches
    pub pinch_max: f32,
    /// Average fingertip distance above which the palm is open
    pub open_palm_min_avg: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            fist_max_avg: 0.23,
            yeah_extended_min: 0.35,
            yeah_curled_max: 0.25,
            pinch_max: 0.08,
            open_palm_min_avg: 0.38,
        }
    }
}

/// Distances the classifier works from
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerMetrics {
    /// Thumb tip to index tip
    pub pinch: f32,
    pub index: f32,
    pub middle: f32,
    pub ring: f32,
    pub pinky: f32,
}

impl FingerMetrics {
    /// Measure a landmark frame. `None` if the frame is incomplete.
    pub fn measure(points: &[Landmark]) -> Option<Self> {
        if points.len() < LANDMARK_COUNT {
            return None;
        }
        let wrist = &points[index::WRIST];
        Some(Self {
            pinch: points[index::INDEX_TIP].distance(&points[index::THUMB_TIP]),
            index: points[index::INDEX_TIP].distance(wrist),
            middle: points[index::MIDDLE_TIP].distance(wrist),
            ring: points[index::RING_TIP].distance(wrist),
            pinky: points[index::PINKY_TIP].distance(wrist),
        })
    }

    /// Mean fingertip-to-wrist distance over the four fingers
    pub fn avg(&self) -> f32 {
        (self.index + self.middle + self.ring + self.pinky) / 4.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct GestureClassifier {
    thresholds: GestureThresholds,
}

impl GestureClassifier {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    /// Classify a landmark frame; incomplete frames are `None`
    pub fn classify(&self, points: &[Landmark]) -> Gesture {
        match FingerMetrics::measure(points) {
            Some(metrics) => self.classify_metrics(&metrics),
            None => Gesture::None,
        }
    }

    pub fn classify_metrics(&self, m: &FingerMetrics) -> Gesture {
        let t = &self.thresholds;
        let avg = m.avg();

        if avg < t.fist_max_avg {
            return Gesture::Fist;
        }
        if m.index > t.yeah_extended_min
            && m.middle > t.yeah_extended_min
            && m.ring < t.yeah_curled_max
            && m.pinky < t.yeah_curled_max
        {
            return Gesture::Yeah;
        }
        if m.pinch < t.pinch_max {
            return Gesture::Pinch;
        }
        if avg > t.open_palm_min_avg {
            return Gesture::OpenPalm;
        }
        Gesture::None
    }
}
