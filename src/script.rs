//! Scripted timelines for headless runs
//!
//! A script is a YAML list of timed events: hand poses, detection failures,
//! legend clicks and photo actions. [`run`] replays it against a fresh
//! [`Experience`] with a 60 Hz render loop and a 30 Hz camera loop, the way
//! the viewer would see it.
//!
//! ```yaml
//! duration_ms: 4000
//! events:
//!   - { at_ms: 0, action: gesture, gesture: OPEN_PALM }
//!   - { at_ms: 1500, action: upload, image: family.png }
//!   - { at_ms: 1600, action: caption, text: "Family 2024" }
//!   - { at_ms: 2000, action: select, mode: NEW_YEAR }
//! ```

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;
use crate::experience::{Experience, FrameSnapshot};
use crate::gesture::{
    DetectionError, Gesture, GestureInput, HandPipeline, LandmarkSource, SimulatedHand,
};
use crate::gesture::source::LandmarkFrame;
use crate::mode::{Mode, Transition};
use crate::photos::{ImageHandle, PhotoError};

/// Render loop period
pub const FRAME_MS: f64 = 1000.0 / 60.0;
/// Camera loop period
pub const CAMERA_MS: u64 = 33;
/// How long to keep running after the last event when no duration is given
const TAIL_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("event at {at_ms}ms failed: {source}")]
    Photo {
        at_ms: u64,
        #[source]
        source: PhotoError,
    },
}

fn default_center() -> (f32, f32) {
    (0.5, 0.5)
}

fn default_hand_size() -> f32 {
    0.2
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Hold a hand showing `gesture` until the next hand event
    Gesture {
        gesture: Gesture,
        #[serde(default = "default_center")]
        center: (f32, f32),
        #[serde(default = "default_hand_size")]
        hand_size: f32,
    },
    /// Take the hand out of view
    NoHand,
    /// The detector fails on the next camera frame
    DetectionError { message: String },
    /// Turn the gesture input on or off
    Input { enabled: bool },
    /// Legend click
    Select { mode: Mode },
    Upload { image: String },
    Caption { text: String },
    Cancel,
    /// Remove the committed photo at `index`
    Remove { index: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ScriptError> {
        let mut script: Script = serde_yaml::from_str(content)?;
        script.events.sort_by_key(|e| e.at_ms);
        Ok(script)
    }

    /// Run length: the explicit duration or a tail after the last event
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
            .unwrap_or_else(|| self.events.last().map(|e| e.at_ms).unwrap_or(0) + TAIL_MS)
    }
}

/// Simulated hand with injectable detector failures
#[derive(Debug, Default)]
struct ScriptHand {
    hand: SimulatedHand,
    failures: VecDeque<DetectionError>,
}

impl LandmarkSource for ScriptHand {
    fn next_frame(&mut self) -> Result<LandmarkFrame, DetectionError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.hand.next_frame()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TransitionRecord {
    pub at_ms: u64,
    pub from: Mode,
    pub to: Mode,
    /// Gesture-driven or a legend click
    pub manual: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub duration_ms: u64,
    pub frames: u64,
    pub camera_frames: u64,
    pub detection_failures: u64,
    pub transitions: Vec<TransitionRecord>,
    pub last: FrameSnapshot,
}

/// Replay `script` against a fresh experience
pub fn run(script: &Script, settings: Settings) -> Result<SimulationReport, ScriptError> {
    let pipeline = HandPipeline::new(settings.gesture);
    let mut input = GestureInput::new(ScriptHand::default(), pipeline);
    let mut exp = Experience::new(settings);

    let duration_ms = script.duration_ms();
    let mut events = script.events.iter().peekable();
    let mut transitions = Vec::new();
    let mut frames: u64 = 0;
    let mut camera_frames: u64 = 0;
    let mut next_camera_ms: u64 = 0;

    info!(events = script.events.len(), duration_ms, "Running script");

    loop {
        let now_ms = (frames as f64 * FRAME_MS) as u64;
        if now_ms > duration_ms {
            break;
        }

        while let Some(event) = events.next_if(|e| e.at_ms <= now_ms) {
            debug!(at_ms = event.at_ms, action = ?event.action, "Script event");
            apply(&mut exp, &mut input, event, now_ms, &mut transitions)?;
        }

        if now_ms >= next_camera_ms {
            let pose = input.poll();
            if let Transition::Accepted { from, to } = exp.on_pose(pose, now_ms) {
                transitions.push(TransitionRecord { at_ms: now_ms, from, to, manual: false });
            }
            camera_frames += 1;
            next_camera_ms += CAMERA_MS;
        }

        exp.tick((FRAME_MS / 1000.0) as f32);
        frames += 1;
    }

    info!(frames, transitions = transitions.len(), mode = exp.mode().label(), "Script finished");
    Ok(SimulationReport {
        duration_ms,
        frames,
        camera_frames,
        detection_failures: input.failures(),
        transitions,
        last: exp.snapshot(),
    })
}

fn apply(
    exp: &mut Experience,
    input: &mut GestureInput<ScriptHand>,
    event: &ScriptEvent,
    now_ms: u64,
    transitions: &mut Vec<TransitionRecord>,
) -> Result<(), ScriptError> {
    let photo_err = |source| ScriptError::Photo { at_ms: event.at_ms, source };

    match &event.action {
        Action::Gesture { gesture, center, hand_size } => {
            let hand = &mut input.source_mut().hand;
            hand.present = true;
            hand.gesture = *gesture;
            hand.center = *center;
            hand.hand_size = *hand_size;
        }
        Action::NoHand => input.source_mut().hand.present = false,
        Action::DetectionError { message } => {
            input
                .source_mut()
                .failures
                .push_back(DetectionError::Failed(message.clone()));
        }
        Action::Input { enabled } => input.set_enabled(*enabled),
        Action::Select { mode } => {
            if let Transition::Accepted { from, to } = exp.select_mode(*mode) {
                transitions.push(TransitionRecord { at_ms: now_ms, from, to, manual: true });
            }
        }
        Action::Upload { image } => {
            exp.upload_photo(ImageHandle::new(image.clone())).map_err(photo_err)?;
        }
        Action::Caption { text } => exp.confirm_caption(text).map_err(photo_err)?,
        Action::Cancel => exp.cancel_caption().map_err(photo_err)?,
        Action::Remove { index } => {
            let id = exp
                .gallery()
                .get(*index)
                .map(|p| p.id.clone())
                .ok_or_else(|| PhotoError::NotFound(format!("#{}", index)))
                .map_err(photo_err)?;
            exp.remove_photo(&id).map_err(photo_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::GroupSettings;
    use crate::text::MessageSettings;

    fn settings() -> Settings {
        let mut group = GroupSettings::foliage();
        group.count = 32;
        Settings {
            seed: Some(1),
            groups: vec![group],
            message: MessageSettings {
                canvas: 128,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_script() {
        let script = Script::from_yaml(
            r#"
events:
  - { at_ms: 900, action: select, mode: NEW_YEAR }
  - { at_ms: 0, action: gesture, gesture: OPEN_PALM }
  - { at_ms: 100, action: no_hand }
  - { at_ms: 200, action: upload, image: a.png }
  - { at_ms: 300, action: caption, text: hi }
  - { at_ms: 400, action: remove, index: 0 }
"#,
        )
        .unwrap();
        assert_eq!(script.events.len(), 6);
        assert_eq!(script.events[0].at_ms, 0);
        assert_eq!(
            script.events[0].action,
            Action::Gesture { gesture: Gesture::OpenPalm, center: (0.5, 0.5), hand_size: 0.2 }
        );
        assert_eq!(script.duration_ms(), 900 + TAIL_MS);
    }

    #[test]
    fn test_held_gestures_follow_debounce() {
        let script = Script::from_yaml(
            r#"
duration_ms: 2500
events:
  - { at_ms: 0, action: gesture, gesture: OPEN_PALM }
  - { at_ms: 200, action: gesture, gesture: OPEN_PALM }
  - { at_ms: 1100, action: gesture, gesture: FIST }
"#,
        )
        .unwrap();
        let report = run(&script, settings()).unwrap();
        let path: Vec<(Mode, Mode)> = report.transitions.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(path, vec![(Mode::Tree, Mode::Scatter), (Mode::Scatter, Mode::Tree)]);
        assert_eq!(report.transitions[0].at_ms, 0);
        assert!(report.transitions[1].at_ms >= 1100);
        assert_eq!(report.last.mode, Mode::Tree);
    }

    #[test]
    fn test_detection_failure_is_counted() {
        let script = Script::from_yaml(
            "events:\n  - { at_ms: 0, action: detection_error, message: boom }\n",
        )
        .unwrap();
        let report = run(&script, settings()).unwrap();
        assert_eq!(report.detection_failures, 1);
        assert_eq!(report.last.mode, Mode::Tree);
    }

    #[test]
    fn test_photo_flow_and_focus() {
        let script = Script::from_yaml(
            r#"
duration_ms: 1500
events:
  - { at_ms: 0, action: upload, image: a.png }
  - { at_ms: 50, action: gesture, gesture: PINCH }
  - { at_ms: 300, action: caption, text: "  Snow  " }
"#,
        )
        .unwrap();
        let report = run(&script, settings()).unwrap();
        // Pinch held through the dialog, accepted once it closes
        assert_eq!(report.last.mode, Mode::Focus);
        assert_eq!(report.last.photos, 1);
        assert!(report.last.focused_photo.is_some());
        assert!(report.transitions[0].at_ms >= 300);
    }

    #[test]
    fn test_caption_without_upload_fails() {
        let script = Script::from_yaml("events:\n  - { at_ms: 10, action: caption, text: x }\n").unwrap();
        let err = run(&script, settings()).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Photo { at_ms: 10, source: PhotoError::NoPendingUpload }
        ));
    }

    #[test]
    fn test_disabled_input_ignores_hand() {
        let script = Script::from_yaml(
            r#"
events:
  - { at_ms: 0, action: input, enabled: false }
  - { at_ms: 0, action: gesture, gesture: YEAH }
"#,
        )
        .unwrap();
        let report = run(&script, settings()).unwrap();
        assert_eq!(report.last.mode, Mode::Tree);
        assert!(!report.last.pose.is_detected);
    }
}
