//! Photo memories hung on the tree
//!
//! An upload becomes a pending photo and opens the caption dialog. While the
//! dialog is open gestures are locked out. Confirming commits the photo to
//! the gallery, cancelling discards it.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::blend::{blend_position, ease, ease_vec, BlendWeights, Transform};
use crate::formation::{self, ChaosShape, GroupShape, MessageShape, RadialPolicy, TreeShape};
use crate::mode::Mode;
use crate::text::TextPool;

/// Longest caption kept, in characters
pub const MAX_CAPTION_CHARS: usize = 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotoError {
    #[error("no upload is waiting for a caption")]
    NoPendingUpload,
    #[error("another upload is still waiting for its caption")]
    UploadInProgress,
    #[error("photo not found: {0}")]
    NotFound(String),
}

/// Opaque reference to the uploaded image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadedPhoto {
    pub id: String,
    pub image: ImageHandle,
    pub home_position: Vec3,
    pub chaos_position: Vec3,
    pub message_position: Vec3,
    pub caption: Option<String>,
    /// Idle spin offset
    pub phase: f32,
    pub transform: Transform,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoSettings {
    pub shape: GroupShape,
    /// Ambient blend smoothing
    pub alpha: f32,
    /// Smoothing while snapping to the camera
    pub focus_alpha: f32,
    /// How far in front of the camera a focused photo floats
    pub focus_distance: f32,
    pub size: f32,
    /// Size multiplier while focused or captioned
    pub focus_scale: f32,
    pub spin_speed: f32,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            shape: GroupShape {
                tree: TreeShape {
                    height: 13.0,
                    max_radius: 5.5,
                    policy: RadialPolicy::Shell { inner: 0.6, span: 0.35 },
                },
                chaos: ChaosShape { base_radius: 14.0, extra_radius: 6.0 },
                message: MessageShape { depth_offset: 0.8, thickness: 0.4 },
            },
            alpha: 0.08,
            focus_alpha: 0.25,
            focus_distance: 9.0,
            size: 1.2,
            focus_scale: 3.0,
            spin_speed: 0.3,
        }
    }
}

/// Trim and cut a caption to [`MAX_CAPTION_CHARS`]. Blank reads as none.
pub fn clean_caption(text: &str) -> Option<String> {
    let caption: String = text.trim().chars().take(MAX_CAPTION_CHARS).collect();
    let caption = caption.trim_end().to_string();
    if caption.is_empty() {
        None
    } else {
        Some(caption)
    }
}

pub struct PhotoGallery {
    settings: PhotoSettings,
    photos: Vec<UploadedPhoto>,
    pending: Option<UploadedPhoto>,
    weights: BlendWeights,
    seq: u64,
}

impl PhotoGallery {
    pub fn new(settings: PhotoSettings) -> Self {
        Self {
            settings,
            photos: Vec::new(),
            pending: None,
            weights: BlendWeights::default(),
            seq: 0,
        }
    }

    /// Place a new photo and open the caption dialog for it
    pub fn begin_upload<R: Rng + ?Sized>(
        &mut self,
        image: ImageHandle,
        pool: &TextPool,
        rng: &mut R,
    ) -> Result<&UploadedPhoto, PhotoError> {
        if self.pending.is_some() {
            return Err(PhotoError::UploadInProgress);
        }

        self.seq += 1;
        let id = format!("photo-{}-{}", chrono::Utc::now().timestamp_millis(), self.seq);
        let shape = &self.settings.shape;
        let home_position = formation::tree_point(rng, &shape.tree);
        let photo = UploadedPhoto {
            id,
            image,
            home_position,
            chaos_position: formation::chaos_point(rng, &shape.chaos),
            message_position: formation::message_point(rng, pool, &shape.message),
            caption: None,
            phase: rng.gen::<f32>() * TAU,
            transform: Transform {
                position: home_position,
                rotation: Quat::IDENTITY,
                scale: self.settings.size,
            },
        };
        info!(id = %photo.id, image = photo.image.as_str(), "Photo uploaded, awaiting caption");
        let photo = self.pending.insert(photo);
        Ok(&*photo)
    }

    /// Commit the pending photo with a cleaned caption
    pub fn confirm_caption(&mut self, text: &str) -> Result<&UploadedPhoto, PhotoError> {
        let mut photo = self.pending.take().ok_or(PhotoError::NoPendingUpload)?;
        photo.caption = clean_caption(text);
        info!(id = %photo.id, caption = ?photo.caption, "Photo committed");
        self.photos.push(photo);
        let index = self.photos.len() - 1;
        Ok(&self.photos[index])
    }

    /// Discard the pending photo
    pub fn cancel_caption(&mut self) -> Result<UploadedPhoto, PhotoError> {
        let photo = self.pending.take().ok_or(PhotoError::NoPendingUpload)?;
        info!(id = %photo.id, "Photo upload cancelled");
        Ok(photo)
    }

    /// Remove a committed photo, returning the index it had
    pub fn remove(&mut self, id: &str) -> Result<usize, PhotoError> {
        let index = self
            .photos
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PhotoError::NotFound(id.to_string()))?;
        self.photos.remove(index);
        info!(id, index, remaining = self.photos.len(), "Photo removed");
        Ok(index)
    }

    /// Caption dialog open
    pub fn is_editing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&UploadedPhoto> {
        self.pending.as_ref()
    }

    pub fn photos(&self) -> &[UploadedPhoto] {
        &self.photos
    }

    pub fn get(&self, index: usize) -> Option<&UploadedPhoto> {
        self.photos.get(index)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    pub fn settings(&self) -> &PhotoSettings {
        &self.settings
    }

    /// One render frame. `focus_point` is where focused and captioned photos
    /// float in front of the camera.
    pub fn update(&mut self, mode: Mode, focus: Option<usize>, focus_point: Vec3, time: f32) {
        let s = self.settings;
        self.weights.ease_toward(BlendWeights::targets(mode), s.alpha);
        let w = self.weights;

        for (i, photo) in self.photos.iter_mut().enumerate() {
            if mode == Mode::Focus && focus == Some(i) {
                snap_to_camera(photo, focus_point, &s);
                continue;
            }
            let target = blend_position(photo.home_position, photo.chaos_position, photo.message_position, w);
            let target_rot = Quat::from_rotation_y(photo.phase + time * s.spin_speed).slerp(Quat::IDENTITY, w.message);
            let t = &mut photo.transform;
            t.position = ease_vec(t.position, target, s.alpha);
            t.rotation = t.rotation.slerp(target_rot, s.alpha);
            t.scale = ease(t.scale, s.size, s.alpha);
        }

        if let Some(photo) = self.pending.as_mut() {
            snap_to_camera(photo, focus_point, &s);
        }
        debug!(scatter = w.scatter, message = w.message, photos = self.photos.len(), "Photos updated");
    }
}

fn snap_to_camera(photo: &mut UploadedPhoto, target: Vec3, s: &PhotoSettings) {
    let t = &mut photo.transform;
    t.position = ease_vec(t.position, target, s.focus_alpha);
    t.rotation = t.rotation.slerp(Quat::IDENTITY, s.focus_alpha);
    t.scale = ease(t.scale, s.size * s.focus_scale, s.focus_alpha);
}
