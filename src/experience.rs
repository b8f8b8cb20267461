//! Application state and the per-frame tick
//!
//! [`Experience`] owns every piece of mutable session state. Two loops
//! drive it: the camera loop calls [`Experience::on_pose`] whenever a new
//! landmark frame has been classified, the render loop calls
//! [`Experience::tick`] once per displayed frame. Both run on the same
//! thread, so the pose and mode are simply last-writer-wins.

use std::sync::Arc;

use glam::Quat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::blend::{BlendWeights, ElementGroup, ElementKind, GroupUniforms, HeroStar, Transform};
use crate::camera::{CameraPose, CameraRig};
use crate::clock::{AnimationClock, SceneRotation};
use crate::config::Settings;
use crate::gesture::PoseSummary;
use crate::mode::{GestureContext, Mode, ModeMachine, Rejection, Transition};
use crate::photos::{ImageHandle, PhotoError, PhotoGallery};
use crate::text::{self, TextPool};

/// Per-group state handed to the renderer
#[derive(Clone, Debug, Serialize)]
pub struct GroupSnapshot {
    pub kind: ElementKind,
    pub count: usize,
    pub weights: BlendWeights,
    pub uniforms: GroupUniforms,
}

/// Serializable view of one frame
#[derive(Clone, Debug, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub time: f32,
    pub mode: Mode,
    pub focus: Option<usize>,
    pub focused_photo: Option<String>,
    pub editing: bool,
    pub pose: PoseSummary,
    pub groups: Vec<GroupSnapshot>,
    pub star: Transform,
    pub photos: usize,
    pub camera: CameraPose,
    pub yaw: f32,
    pub clock_paused: bool,
}

pub struct Experience {
    settings: Settings,
    machine: ModeMachine,
    pose: PoseSummary,
    pool: Arc<TextPool>,
    groups: Vec<ElementGroup>,
    star: HeroStar,
    gallery: PhotoGallery,
    camera: CameraRig,
    clock: AnimationClock,
    rotation: SceneRotation,
    rng: StdRng,
    frame: u64,
}

impl Experience {
    /// Build the tree: sample the text once, then every group's formations
    pub fn new(settings: Settings) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let machine = ModeMachine::with_seed(settings.debounce_ms, rng.gen());

        let pool = Arc::new(text::build_pool(&settings.message));
        let groups: Vec<ElementGroup> = settings
            .groups
            .iter()
            .map(|g| ElementGroup::build(g, &pool, &mut rng))
            .collect();
        info!(
            text_points = pool.len(),
            groups = groups.len(),
            elements = groups.iter().map(|g| g.len()).sum::<usize>(),
            "Experience ready"
        );

        Self {
            machine,
            pose: PoseSummary::not_detected(),
            pool,
            groups,
            star: HeroStar::new(settings.star),
            gallery: PhotoGallery::new(settings.photo),
            camera: CameraRig::new(settings.camera),
            clock: AnimationClock::new(),
            rotation: SceneRotation::new(settings.rotation),
            rng,
            frame: 0,
            settings,
        }
    }

    /// Camera-loop entry: store the fresh pose and feed its gesture to the
    /// mode machine
    pub fn on_pose(&mut self, pose: PoseSummary, now_ms: u64) -> Transition {
        self.pose = pose;
        let ctx = GestureContext {
            editing: self.gallery.is_editing(),
            photo_count: self.gallery.len(),
        };
        let transition = self.machine.apply_gesture(pose.gesture, now_ms, ctx);
        if let Transition::Rejected { reason } = transition {
            if !matches!(reason, Rejection::NoGesture | Rejection::AlreadyActive) {
                debug!(gesture = pose.gesture.label(), ?reason, "Gesture rejected");
            }
        }
        transition
    }

    /// Legend click
    pub fn select_mode(&mut self, mode: Mode) -> Transition {
        self.machine.select(mode)
    }

    /// Start an upload; returns the new photo's id
    pub fn upload_photo(&mut self, image: ImageHandle) -> Result<String, PhotoError> {
        let photo = self.gallery.begin_upload(image, &self.pool, &mut self.rng)?;
        Ok(photo.id.clone())
    }

    pub fn confirm_caption(&mut self, text: &str) -> Result<(), PhotoError> {
        self.gallery.confirm_caption(text)?;
        Ok(())
    }

    pub fn cancel_caption(&mut self) -> Result<(), PhotoError> {
        self.gallery.cancel_caption()?;
        Ok(())
    }

    pub fn remove_photo(&mut self, id: &str) -> Result<(), PhotoError> {
        let index = self.gallery.remove(id)?;
        self.machine.photo_removed(index, self.gallery.len());
        Ok(())
    }

    /// Render-loop entry: advance everything by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        let mode = self.machine.mode();
        self.rotation.update(dt, &self.pose, mode, &mut self.clock);
        self.clock.advance(dt);
        let time = self.clock.elapsed();

        self.camera.update(&self.pose, mode);
        for group in &mut self.groups {
            group.update(mode, time);
        }
        self.star.update(mode, time);

        let focus_point = self.camera.focus_point(self.settings.photo.focus_distance);
        // Photos live in the rotated scene; undo the yaw so the focus point
        // stays in front of the camera
        let focus_point = Quat::from_rotation_y(-self.scene_yaw()).mul_vec3(focus_point);
        self.gallery.update(mode, self.machine.focus(), focus_point, time);

        self.frame += 1;
    }

    /// Yaw applied to the whole scene, faded out while the message is up
    pub fn scene_yaw(&self) -> f32 {
        let message = self.groups.first().map(|g| g.weights().message).unwrap_or(0.0);
        self.rotation.yaw() * (1.0 - message)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let time = self.clock.elapsed();
        let focus = self.machine.focus();
        FrameSnapshot {
            frame: self.frame,
            time,
            mode: self.machine.mode(),
            focus,
            focused_photo: focus.and_then(|i| self.gallery.get(i)).map(|p| p.id.clone()),
            editing: self.gallery.is_editing(),
            pose: self.pose,
            groups: self
                .groups
                .iter()
                .map(|g| GroupSnapshot {
                    kind: g.kind(),
                    count: g.len(),
                    weights: g.weights(),
                    uniforms: g.uniforms(time),
                })
                .collect(),
            star: self.star.transform(),
            photos: self.gallery.len(),
            camera: self.camera.pose(),
            yaw: self.scene_yaw(),
            clock_paused: self.clock.is_paused(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn focus(&self) -> Option<usize> {
        self.machine.focus()
    }

    pub fn pose(&self) -> PoseSummary {
        self.pose
    }

    pub fn groups(&self) -> &[ElementGroup] {
        &self.groups
    }

    pub fn star(&self) -> &HeroStar {
        &self.star
    }

    pub fn gallery(&self) -> &PhotoGallery {
        &self.gallery
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn pool(&self) -> &TextPool {
        &self.pool
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
