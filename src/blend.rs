//! Blend Engine
//!
//! Per frame, each element group eases a scatter weight and a message weight
//! toward the targets implied by the current mode, then rewrites every
//! element's transform from its three fixed formations:
//!
//! ```text
//! position = mix(mix(home, chaos, scatter), message, message)
//! ```
//!
//! The nesting matters: at `message = 1` an element sits exactly on its
//! message point whatever the scatter weight is.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::formation::{self, ChaosShape, Formations, GroupShape, MessageShape, RadialPolicy, TreeShape};
use crate::mode::Mode;
use crate::text::TextPool;

/// Exponential smoothing step. `alpha` is clamped to [0, 1] so the result
/// always lies between `current` and `target`.
pub fn ease(current: f32, target: f32, alpha: f32) -> f32 {
    current + (target - current) * alpha.clamp(0.0, 1.0)
}

/// Linear interpolation that is exact at both ends
pub fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Vector form of [`ease`]
pub fn ease_vec(current: Vec3, target: Vec3, alpha: f32) -> Vec3 {
    mix(current, target, alpha.clamp(0.0, 1.0))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub scatter: f32,
    pub message: f32,
}

impl BlendWeights {
    /// Targets implied by a mode
    pub fn targets(mode: Mode) -> Self {
        Self {
            scatter: match mode {
                Mode::Scatter | Mode::Focus => 1.0,
                Mode::Tree | Mode::NewYear => 0.0,
            },
            message: match mode {
                Mode::NewYear => 1.0,
                _ => 0.0,
            },
        }
    }

    pub fn ease_toward(&mut self, target: BlendWeights, alpha: f32) {
        self.scatter = ease(self.scatter, target.scatter, alpha);
        self.message = ease(self.message, target.message, alpha);
    }
}

/// Tree/chaos blend first, then toward the message
pub fn blend_position(home: Vec3, chaos: Vec3, message: Vec3, w: BlendWeights) -> Vec3 {
    mix(mix(home, chaos, w.scatter), message, w.message)
}

/// Group-level values for shader-side secondary animation
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GroupUniforms {
    pub scatter_weight: f32,
    pub message_weight: f32,
    pub time: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Foliage,
    Spiral,
    Ornament,
    Photo,
    Star,
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Foliage => "Foliage",
            ElementKind::Spiral => "Spiral",
            ElementKind::Ornament => "Ornaments",
            ElementKind::Photo => "Photos",
            ElementKind::Star => "Star",
        }
    }
}

/// One element group as configured
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub kind: ElementKind,
    pub count: usize,
    pub shape: GroupShape,
    /// Per-frame smoothing factor for the blend weights
    pub alpha: f32,
    /// Base element size
    pub size: f32,
    /// Idle spin around the element's own axis, rad/s
    pub spin_speed: f32,
    /// Tumble rate while scattered, rad/s
    pub tumble_speed: f32,
    /// Size multiplier once on the message
    pub message_scale: f32,
}

impl GroupSettings {
    pub fn foliage() -> Self {
        Self {
            kind: ElementKind::Foliage,
            count: 4000,
            shape: GroupShape {
                tree: TreeShape { height: 15.0, max_radius: 6.0, policy: RadialPolicy::UniformDisk },
                chaos: ChaosShape { base_radius: 18.0, extra_radius: 8.0 },
                message: MessageShape { depth_offset: 0.0, thickness: 0.6 },
            },
            alpha: 0.06,
            size: 0.08,
            spin_speed: 0.0,
            tumble_speed: 0.0,
            message_scale: 1.0,
        }
    }

    pub fn spiral() -> Self {
        Self {
            kind: ElementKind::Spiral,
            count: 600,
            shape: GroupShape {
                tree: TreeShape { height: 15.5, max_radius: 6.5, policy: RadialPolicy::Spiral { turns: 5.0 } },
                chaos: ChaosShape { base_radius: 20.0, extra_radius: 6.0 },
                message: MessageShape { depth_offset: 0.2, thickness: 0.3 },
            },
            alpha: 0.05,
            size: 0.06,
            spin_speed: 0.0,
            tumble_speed: 0.0,
            message_scale: 1.0,
        }
    }

    pub fn ornaments() -> Self {
        Self {
            kind: ElementKind::Ornament,
            count: 180,
            shape: GroupShape {
                tree: TreeShape {
                    height: 14.0,
                    max_radius: 6.2,
                    policy: RadialPolicy::Shell { inner: 0.6, span: 0.35 },
                },
                chaos: ChaosShape { base_radius: 16.0, extra_radius: 10.0 },
                message: MessageShape { depth_offset: 0.4, thickness: 0.8 },
            },
            alpha: 0.08,
            size: 0.3,
            spin_speed: 0.6,
            tumble_speed: 1.5,
            message_scale: 0.5,
        }
    }
}

/// A group of like elements stored as flat parallel buffers
pub struct ElementGroup {
    kind: ElementKind,
    formations: Arc<Formations>,
    weights: BlendWeights,
    alpha: f32,
    spin_speed: f32,
    tumble_speed: f32,
    message_scale: f32,
    phases: Vec<f32>,
    base_scales: Vec<f32>,
    positions: Vec<Vec3>,
    rotations: Vec<Quat>,
    scales: Vec<f32>,
}

impl ElementGroup {
    /// Sample formations and per-element constants for a configured group
    pub fn build<R: Rng + ?Sized>(settings: &GroupSettings, pool: &TextPool, rng: &mut R) -> Self {
        let formations = formation::generate(settings.count, &settings.shape, pool, rng);
        Self::new(settings, Arc::new(formations), rng)
    }

    pub fn new<R: Rng + ?Sized>(settings: &GroupSettings, formations: Arc<Formations>, rng: &mut R) -> Self {
        let n = formations.len();
        let phases: Vec<f32> = (0..n).map(|_| rng.gen::<f32>()).collect();
        let base_scales: Vec<f32> = (0..n)
            .map(|_| settings.size * (0.6 + rng.gen::<f32>() * 0.8))
            .collect();

        Self {
            kind: settings.kind,
            positions: formations.home.clone(),
            rotations: vec![Quat::IDENTITY; n],
            scales: base_scales.clone(),
            formations,
            weights: BlendWeights::default(),
            alpha: settings.alpha,
            spin_speed: settings.spin_speed,
            tumble_speed: settings.tumble_speed,
            message_scale: settings.message_scale,
            phases,
            base_scales,
        }
    }

    /// Ease the weights toward `mode` and rewrite every transform
    pub fn update(&mut self, mode: Mode, time: f32) {
        self.weights.ease_toward(BlendWeights::targets(mode), self.alpha);
        let w = self.weights;
        let f = &self.formations;
        let size_factor = 1.0 + (self.message_scale - 1.0) * w.message;

        for i in 0..self.positions.len() {
            self.positions[i] = blend_position(f.home[i], f.chaos[i], f.message[i], w);

            let phase = self.phases[i] * TAU;
            let idle = Quat::from_rotation_y(phase + time * self.spin_speed);
            let tumble_angle = phase + time * self.tumble_speed;
            let tumble = Quat::from_euler(EulerRot::XYZ, tumble_angle, tumble_angle * 0.7, phase);
            self.rotations[i] = idle.slerp(tumble, w.scatter).slerp(Quat::IDENTITY, w.message);

            self.scales[i] = self.base_scales[i] * size_factor;
        }
    }

    pub fn uniforms(&self, time: f32) -> GroupUniforms {
        GroupUniforms {
            scatter_weight: self.weights.scatter,
            message_weight: self.weights.message,
            time,
        }
    }

    pub fn transform(&self, i: usize) -> Transform {
        Transform {
            position: self.positions[i],
            rotation: self.rotations[i],
            scale: self.scales[i],
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    pub fn formations(&self) -> &Formations {
        &self.formations
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn rotations(&self) -> &[Quat] {
        &self.rotations
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarSettings {
    pub size: f32,
    /// Resting place on top of the tree
    pub tree_top: Vec3,
    /// Resting place above the greeting
    pub message_position: Vec3,
    pub alpha: f32,
    pub spin_speed: f32,
    pub message_scale: f32,
}

impl Default for StarSettings {
    fn default() -> Self {
        Self {
            size: 0.9,
            tree_top: Vec3::new(0.0, 8.2, 0.0),
            message_position: Vec3::new(0.0, 5.0, 0.0),
            alpha: 0.05,
            spin_speed: 0.8,
            message_scale: 0.7,
        }
    }
}

/// The star on top. Eases straight toward a fixed point instead of
/// blending formations.
pub struct HeroStar {
    settings: StarSettings,
    transform: Transform,
}

impl HeroStar {
    pub fn new(settings: StarSettings) -> Self {
        Self {
            transform: Transform {
                position: settings.tree_top,
                rotation: Quat::IDENTITY,
                scale: settings.size,
            },
            settings,
        }
    }

    pub fn update(&mut self, mode: Mode, time: f32) {
        let s = &self.settings;
        let (target, scale) = match mode {
            Mode::NewYear => (s.message_position, s.size * s.message_scale),
            Mode::Tree | Mode::Scatter | Mode::Focus => (s.tree_top, s.size),
        };
        self.transform.position = ease_vec(self.transform.position, target, s.alpha);
        self.transform.scale = ease(self.transform.scale, scale, s.alpha);
        self.transform.rotation = Quat::from_rotation_y(time * s.spin_speed);
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }
}
