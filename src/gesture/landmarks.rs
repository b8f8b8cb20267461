//! Landmark Normalizer
//!
//! Reduces one frame of hand landmarks to a [`PoseSummary`]: where the hand
//! is (mirrored into [-1, 1]), how large it appears and whether one was seen.

use serde::{Deserialize, Serialize};

use super::classifier::Gesture;

/// Number of landmarks the hand model reports per hand
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices (MediaPipe hand model convention)
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP: usize = 16;
    pub const PINKY_TIP: usize = 20;
}

/// A single hand landmark in normalized image coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0.0 to 1.0 across the image width
    pub x: f32,
    /// 0.0 to 1.0 down the image height
    pub y: f32,
    /// Depth relative to the wrist
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in all three axes
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance in the image plane only
    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Per-frame reduced hand state. Overwritten every camera frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSummary {
    /// Pointer x in [-1, 1], mirrored for the selfie camera
    pub x: f32,
    /// Pointer y in [-1, 1], growing downward like the image
    pub y: f32,
    /// Wrist to middle-knuckle distance; larger means closer to the camera
    pub hand_size: f32,
    pub is_detected: bool,
    pub gesture: Gesture,
}

impl PoseSummary {
    /// The "no hand this frame" summary
    pub fn not_detected() -> Self {
        Self::default()
    }
}

/// Normalize one frame of landmarks. The gesture is left as `None`; the
/// classifier fills it in.
pub fn normalize(points: Option<&[Landmark]>) -> PoseSummary {
    let points = match points {
        Some(p) if p.len() >= LANDMARK_COUNT => p,
        _ => return PoseSummary::not_detected(),
    };

    let wrist = &points[index::WRIST];
    let middle_mcp = &points[index::MIDDLE_MCP];

    PoseSummary {
        x: (middle_mcp.x - 0.5) * -2.0,
        y: (middle_mcp.y - 0.5) * 2.0,
        hand_size: middle_mcp.planar_distance(wrist),
        is_detected: true,
        gesture: Gesture::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_hand(wrist: (f32, f32), mcp: (f32, f32)) -> Vec<Landmark> {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        points[index::WRIST] = Landmark::new(wrist.0, wrist.1, 0.0);
        points[index::MIDDLE_MCP] = Landmark::new(mcp.0, mcp.1, 0.0);
        points
    }

    #[test]
    fn test_no_hand_resets_everything() {
        let pose = normalize(None);
        assert!(!pose.is_detected);
        assert_eq!(pose.x, 0.0);
        assert_eq!(pose.y, 0.0);
        assert_eq!(pose.hand_size, 0.0);
        assert_eq!(pose.gesture, Gesture::None);
    }

    #[test]
    fn test_short_frame_is_not_detected() {
        let points = vec![Landmark::new(0.2, 0.2, 0.0); 20];
        assert!(!normalize(Some(&points)).is_detected);
    }

    #[test]
    fn test_pointer_is_mirrored() {
        // Knuckle on the right of the image -> pointer on the left
        let points = flat_hand((0.75, 0.9), (0.75, 0.75));
        let pose = normalize(Some(&points));
        assert!(pose.is_detected);
        assert!((pose.x - -0.5).abs() < 1e-6);
        assert!((pose.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hand_size_is_wrist_to_knuckle() {
        let points = flat_hand((0.5, 0.8), (0.5, 0.6));
        let pose = normalize(Some(&points));
        assert!((pose.hand_size - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_hand_size_ignores_depth() {
        let mut points = flat_hand((0.5, 0.8), (0.5, 0.6));
        points[index::MIDDLE_MCP].z = 0.4;
        let pose = normalize(Some(&points));
        assert!((pose.hand_size - 0.2).abs() < 1e-6);
    }
}
