//! Gesture input
//!
//! The hand-landmark model is an external producer behind [`LandmarkSource`].
//! [`GestureInput`] polls it once per camera frame, runs the pipeline and
//! keeps the latest [`PoseSummary`]. Detection failures never escape: they
//! are logged and read as "no hand this frame".

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{info, warn};

use super::classifier::Gesture;
use super::landmarks::{Landmark, PoseSummary, LANDMARK_COUNT};
use super::synthetic::hand_landmarks;
use super::HandPipeline;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("hand landmark model not loaded yet")]
    ModelNotLoaded,
    #[error("landmark detection failed: {0}")]
    Failed(String),
    #[error("malformed landmark frame: expected {expected} points, got {got}")]
    MalformedFrame { expected: usize, got: usize },
}

/// One camera frame worth of landmarks, or `None` when no hand is visible
pub type LandmarkFrame = Option<Vec<Landmark>>;

/// Anything that can deliver hand landmarks frame by frame.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> Result<LandmarkFrame, DetectionError>;
}

/// Polls a landmark source and owns the current pose summary
pub struct GestureInput<S> {
    source: S,
    pipeline: HandPipeline,
    enabled: bool,
    pose: PoseSummary,
    failures: u64,
}

impl<S: LandmarkSource> GestureInput<S> {
    pub fn new(source: S, pipeline: HandPipeline) -> Self {
        Self {
            source,
            pipeline,
            enabled: true,
            pose: PoseSummary::not_detected(),
            failures: 0,
        }
    }

    /// Run one camera-frame step and return the fresh pose
    pub fn poll(&mut self) -> PoseSummary {
        if !self.enabled {
            return self.pose;
        }

        self.pose = match self.source.next_frame().and_then(check_frame) {
            Ok(frame) => self.pipeline.process(frame.as_deref()),
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, failures = self.failures, "Landmark detection failed, no detection this frame");
                PoseSummary::not_detected()
            }
        };
        self.pose
    }

    /// Enable or disable the input. Disabling stops polling immediately and
    /// resets the pose.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.pose = PoseSummary::not_detected();
        }
        info!("Gesture input {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pose(&self) -> PoseSummary {
        self.pose
    }

    /// Detection failures seen so far
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

/// A hand frame must carry every landmark; an empty one reads as no hand
fn check_frame(frame: LandmarkFrame) -> Result<LandmarkFrame, DetectionError> {
    match frame.as_deref() {
        Some(points) if !points.is_empty() && points.len() < LANDMARK_COUNT => Err(DetectionError::MalformedFrame {
            expected: LANDMARK_COUNT,
            got: points.len(),
        }),
        _ => Ok(frame),
    }
}

/// Replays a fixed queue of frames; an exhausted queue reads as no hand
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<Result<LandmarkFrame, DetectionError>>,
    polls: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: LandmarkFrame) {
        self.frames.push_back(Ok(frame));
    }

    pub fn push_error(&mut self, error: DetectionError) {
        self.frames.push_back(Err(error));
    }

    /// Queue a synthetic hand showing `gesture`
    pub fn push_gesture(&mut self, gesture: Gesture, center: (f32, f32), hand_size: f32) {
        self.push_frame(Some(hand_landmarks(gesture, center, hand_size)));
    }

    /// How many times the source was asked for a frame
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl LandmarkSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<LandmarkFrame, DetectionError> {
        self.polls += 1;
        self.frames.pop_front().unwrap_or(Ok(None))
    }
}

/// Keyboard/mouse driven stand-in for the webcam
#[derive(Debug, Clone)]
pub struct SimulatedHand {
    /// Whether a hand is "in front of the camera"
    pub present: bool,
    pub gesture: Gesture,
    /// Knuckle position in normalized image coordinates
    pub center: (f32, f32),
    pub hand_size: f32,
}

impl Default for SimulatedHand {
    fn default() -> Self {
        Self {
            present: false,
            gesture: Gesture::None,
            center: (0.5, 0.5),
            hand_size: 0.2,
        }
    }
}

impl LandmarkSource for SimulatedHand {
    fn next_frame(&mut self) -> Result<LandmarkFrame, DetectionError> {
        if !self.present {
            return Ok(None);
        }
        Ok(Some(hand_landmarks(self.gesture, self.center, self.hand_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(source: ScriptedSource) -> GestureInput<ScriptedSource> {
        GestureInput::new(source, HandPipeline::default())
    }

    #[test]
    fn test_poll_classifies_frame() {
        let mut source = ScriptedSource::new();
        source.push_gesture(Gesture::Fist, (0.5, 0.5), 0.2);
        let mut input = input(source);

        let pose = input.poll();
        assert!(pose.is_detected);
        assert_eq!(pose.gesture, Gesture::Fist);
    }

    #[test]
    fn test_failure_reads_as_no_hand() {
        let mut source = ScriptedSource::new();
        source.push_gesture(Gesture::OpenPalm, (0.5, 0.5), 0.2);
        source.push_error(DetectionError::ModelNotLoaded);
        let mut input = input(source);

        assert!(input.poll().is_detected);
        let pose = input.poll();
        assert!(!pose.is_detected);
        assert_eq!(pose.gesture, Gesture::None);
        assert_eq!(input.failures(), 1);
    }

    #[test]
    fn test_short_frame_counts_as_failure() {
        let mut source = ScriptedSource::new();
        source.push_frame(Some(vec![Landmark::default(); 5]));
        source.push_frame(Some(Vec::new()));
        let mut input = input(source);

        assert!(!input.poll().is_detected);
        assert_eq!(input.failures(), 1);
        assert!(!input.poll().is_detected);
        assert_eq!(input.failures(), 1);
        assert_eq!(
            check_frame(Some(vec![Landmark::default(); 20])),
            Err(DetectionError::MalformedFrame { expected: LANDMARK_COUNT, got: 20 })
        );
    }

    #[test]
    fn test_disable_stops_polling_and_resets() {
        let mut source = ScriptedSource::new();
        source.push_gesture(Gesture::Yeah, (0.5, 0.5), 0.2);
        source.push_gesture(Gesture::Yeah, (0.5, 0.5), 0.2);
        let mut input = input(source);

        assert!(input.poll().is_detected);
        input.set_enabled(false);
        assert!(!input.pose().is_detected);

        let pose = input.poll();
        assert!(!pose.is_detected);
        assert_eq!(input.source().polls(), 1);

        input.set_enabled(true);
        assert_eq!(input.poll().gesture, Gesture::Yeah);
    }

    #[test]
    fn test_simulated_hand_absent() {
        let mut hand = SimulatedHand::default();
        assert_eq!(hand.next_frame(), Ok(None));
        hand.present = true;
        hand.gesture = Gesture::Pinch;
        let frame = hand.next_frame().unwrap().unwrap();
        assert_eq!(frame.len(), LANDMARK_COUNT);
    }
}
