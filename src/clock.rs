//! Animation time and scene rotation
//!
//! Idle animation reads [`AnimationClock`]. While the hand is steering the
//! scene the clock stops accumulating so the idle spin and the hand do not
//! fight; position blending keeps running off its own easing regardless.

use serde::{Deserialize, Serialize};

use crate::gesture::PoseSummary;
use crate::mode::Mode;

/// Elapsed animation seconds, paused on demand
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationClock {
    elapsed: f32,
    paused: bool,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `dt` seconds unless paused. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, dt: f32) {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.elapsed += dt;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Idle yaw rate, rad/s
    pub idle_speed: f32,
    /// Yaw rate at the edge of the frame when the hand steers, rad/s
    pub hand_speed: f32,
    /// Hand offsets closer to center than this do nothing
    pub dead_zone: f32,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            idle_speed: 0.15,
            hand_speed: 1.6,
            dead_zone: 0.1,
        }
    }
}

/// Yaw of the whole scene around the trunk
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneRotation {
    settings: RotationSettings,
    yaw: f32,
    steering: bool,
}

impl SceneRotation {
    pub fn new(settings: RotationSettings) -> Self {
        Self {
            settings,
            yaw: 0.0,
            steering: false,
        }
    }

    /// Whether the hand controls the scene this frame
    pub fn hand_steers(pose: &PoseSummary, mode: Mode) -> bool {
        pose.is_detected && mode == Mode::Scatter
    }

    /// Advance the yaw by one frame and pause or resume `clock` to match
    pub fn update(&mut self, dt: f32, pose: &PoseSummary, mode: Mode, clock: &mut AnimationClock) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.steering = Self::hand_steers(pose, mode);
        clock.set_paused(self.steering);

        let speed = if self.steering {
            let x = pose.x.clamp(-1.0, 1.0);
            if x.abs() < self.settings.dead_zone {
                0.0
            } else {
                x * self.settings.hand_speed
            }
        } else {
            self.settings.idle_speed
        };
        self.yaw = (self.yaw + speed * dt).rem_euclid(std::f32::consts::TAU);
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn is_steering(&self) -> bool {
        self.steering
    }
}
