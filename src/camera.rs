//! Camera/Zoom Controller
//!
//! Hand size drives the orbit distance (closer hand, closer camera). In
//! NEW_YEAR mode the eye additionally eases onto a fixed framing of the
//! message, fast on the first frame and gently afterwards.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blend::{ease, ease_vec};
use crate::gesture::PoseSummary;
use crate::mode::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Orbit distance with no hand in view
    pub base_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Hand size range mapped onto [max_distance, min_distance]
    pub hand_min: f32,
    pub hand_max: f32,
    pub zoom_alpha: f32,
    /// Point the orbit looks at
    pub look_at: Vec3,
    /// Direction from `look_at` toward the eye, normalized on use
    pub direction: Vec3,
    /// Easing back onto the orbit after the message framing
    pub return_alpha: f32,
    pub message_position: Vec3,
    pub message_target: Vec3,
    pub message_snap_alpha: f32,
    pub message_settle_alpha: f32,
    pub fov_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            base_distance: 30.0,
            min_distance: 14.0,
            max_distance: 42.0,
            hand_min: 0.08,
            hand_max: 0.45,
            zoom_alpha: 0.05,
            look_at: Vec3::ZERO,
            direction: Vec3::new(0.0, 0.15, 1.0),
            return_alpha: 0.08,
            message_position: Vec3::new(0.0, 0.0, 26.0),
            message_target: Vec3::ZERO,
            message_snap_alpha: 0.25,
            message_settle_alpha: 0.05,
            fov_degrees: 45.0,
        }
    }
}

/// Camera state the renderer consumes
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub distance: f32,
    pub fov_degrees: f32,
}

pub struct CameraRig {
    settings: CameraSettings,
    distance: f32,
    position: Vec3,
    target: Vec3,
    in_message: bool,
}

impl CameraRig {
    pub fn new(settings: CameraSettings) -> Self {
        let distance = settings.base_distance;
        Self {
            position: orbit_point(&settings, distance),
            target: settings.look_at,
            distance,
            in_message: false,
            settings,
        }
    }

    /// Distance the zoom eases toward for this pose
    pub fn target_distance(&self, pose: &PoseSummary) -> f32 {
        let s = &self.settings;
        if !pose.is_detected {
            return s.base_distance;
        }
        let span = s.hand_max - s.hand_min;
        if span <= f32::EPSILON {
            return s.base_distance;
        }
        let t = (pose.hand_size.clamp(s.hand_min, s.hand_max) - s.hand_min) / span;
        s.max_distance + (s.min_distance - s.max_distance) * t
    }

    /// One render frame
    pub fn update(&mut self, pose: &PoseSummary, mode: Mode) {
        let s = self.settings;
        self.distance = ease(self.distance, self.target_distance(pose), s.zoom_alpha);

        if mode == Mode::NewYear {
            let alpha = if self.in_message {
                s.message_settle_alpha
            } else {
                debug!("Snapping camera to message framing");
                s.message_snap_alpha
            };
            self.in_message = true;
            self.position = ease_vec(self.position, s.message_position, alpha);
            self.target = ease_vec(self.target, s.message_target, alpha);
        } else {
            self.in_message = false;
            let orbit = orbit_point(&s, self.distance);
            self.position = ease_vec(self.position, orbit, s.return_alpha);
            self.target = ease_vec(self.target, s.look_at, s.return_alpha);
        }
    }

    /// Point `distance` in front of the eye along the view direction
    pub fn focus_point(&self, distance: f32) -> Vec3 {
        let forward = (self.target - self.position).normalize_or_zero();
        self.position + forward * distance
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            target: self.target,
            distance: self.distance,
            fov_degrees: self.settings.fov_degrees,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }
}

fn orbit_point(settings: &CameraSettings, distance: f32) -> Vec3 {
    let dir = settings.direction.try_normalize().unwrap_or(Vec3::Z);
    settings.look_at + dir * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Gesture;

    fn hand(size: f32) -> PoseSummary {
        PoseSummary {
            x: 0.0,
            y: 0.0,
            hand_size: size,
            is_detected: true,
            gesture: Gesture::None,
        }
    }

    #[test]
    fn test_target_distance_inverted_and_clamped() {
        let rig = CameraRig::new(CameraSettings::default());
        assert_eq!(rig.target_distance(&hand(0.08)), 42.0);
        assert_eq!(rig.target_distance(&hand(0.45)), 14.0);
        assert_eq!(rig.target_distance(&hand(0.01)), 42.0);
        assert_eq!(rig.target_distance(&hand(0.9)), 14.0);
        assert!(rig.target_distance(&hand(0.3)) < rig.target_distance(&hand(0.2)));
        assert_eq!(rig.target_distance(&PoseSummary::not_detected()), 30.0);
    }

    #[test]
    fn test_zoom_eases() {
        let mut rig = CameraRig::new(CameraSettings::default());
        rig.update(&hand(0.45), Mode::Tree);
        // 30 + (14 - 30) * 0.05
        assert!((rig.distance() - 29.2).abs() < 1e-4);

        for _ in 0..400 {
            rig.update(&hand(0.45), Mode::Tree);
        }
        assert!((rig.distance() - 14.0).abs() < 0.01);

        for _ in 0..400 {
            rig.update(&PoseSummary::not_detected(), Mode::Tree);
        }
        assert!((rig.distance() - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_message_snap_then_settle() {
        let settings = CameraSettings::default();
        let mut rig = CameraRig::new(settings);
        let start = rig.position();
        let pose = PoseSummary::not_detected();

        rig.update(&pose, Mode::NewYear);
        let first = rig.position();
        let expected = start + (settings.message_position - start) * 0.25;
        assert!(first.distance(expected) < 1e-4);

        rig.update(&pose, Mode::NewYear);
        let second = rig.position();
        let expected = first + (settings.message_position - first) * 0.05;
        assert!(second.distance(expected) < 1e-4);
    }

    #[test]
    fn test_reentering_message_snaps_again() {
        let settings = CameraSettings::default();
        let mut rig = CameraRig::new(settings);
        let pose = PoseSummary::not_detected();
        rig.update(&pose, Mode::NewYear);
        rig.update(&pose, Mode::Tree);
        let before = rig.position();
        rig.update(&pose, Mode::NewYear);
        let expected = before + (settings.message_position - before) * 0.25;
        assert!(rig.position().distance(expected) < 1e-4);
    }

    #[test]
    fn test_focus_point_in_front_of_eye() {
        let rig = CameraRig::new(CameraSettings::default());
        let p = rig.focus_point(5.0);
        assert!((p.distance(rig.position()) - 5.0).abs() < 1e-4);
        assert!(p.distance(rig.target()) < rig.position().distance(rig.target()));
    }
}
