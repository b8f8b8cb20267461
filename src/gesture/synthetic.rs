//! Synthetic hands
//!
//! Builds a plausible 21-point landmark frame for each gesture so the
//! simulated hand (viewer keyboard/mouse) and scripted runs exercise the same
//! normalize + classify path a real hand model would.

use super::classifier::Gesture;
use super::landmarks::{index, Landmark, LANDMARK_COUNT};

/// Fingertip reach from the wrist: thumb, index, middle, ring, pinky
fn reach(gesture: Gesture) -> [f32; 5] {
    match gesture {
        Gesture::Fist => [0.15, 0.15, 0.15, 0.15, 0.15],
        Gesture::OpenPalm => [0.30, 0.45, 0.48, 0.45, 0.40],
        Gesture::Yeah => [0.25, 0.45, 0.45, 0.18, 0.18],
        Gesture::Pinch => [0.25, 0.30, 0.30, 0.30, 0.28],
        Gesture::None => [0.25, 0.30, 0.30, 0.30, 0.30],
    }
}

/// Finger fan, degrees from straight up: thumb, index, middle, ring, pinky
const FAN_DEG: [f32; 5] = [-55.0, -15.0, -5.0, 5.0, 15.0];

/// First landmark of each finger chain (four joints per finger)
const CHAIN_START: [usize; 5] = [1, 5, 9, 13, 17];

/// Build a landmark frame showing `gesture`.
///
/// The middle knuckle sits at `center` (normalized image coords) and the
/// wrist is `hand_size` below it, so the normalizer reports exactly
/// `hand_size`. Fingertip geometry is fixed since the classifier thresholds
/// are absolute.
pub fn hand_landmarks(gesture: Gesture, center: (f32, f32), hand_size: f32) -> Vec<Landmark> {
    let wrist = Landmark::new(center.0, center.1 + hand_size, 0.0);
    let reach = reach(gesture);

    let mut points = vec![wrist; LANDMARK_COUNT];
    for finger in 0..5 {
        let angle = FAN_DEG[finger].to_radians();
        let dir = (angle.sin(), -angle.cos());
        for joint in 0..4 {
            let frac = (joint + 1) as f32 / 4.0;
            let r = reach[finger] * frac;
            points[CHAIN_START[finger] + joint] =
                Landmark::new(wrist.x + dir.0 * r, wrist.y + dir.1 * r, 0.0);
        }
    }

    if gesture == Gesture::Pinch {
        let tip = points[index::INDEX_TIP];
        points[index::THUMB_TIP] = Landmark::new(tip.x + 0.03, tip.y, 0.0);
    }

    points[index::MIDDLE_MCP] = Landmark::new(center.0, center.1, 0.0);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::classifier::GestureClassifier;
    use crate::gesture::landmarks::normalize;

    #[test]
    fn test_round_trips_through_classifier() {
        let classifier = GestureClassifier::default();
        for gesture in Gesture::ALL {
            for center in [(0.5, 0.5), (0.2, 0.3), (0.8, 0.6)] {
                let points = hand_landmarks(gesture, center, 0.2);
                assert_eq!(classifier.classify(&points), gesture, "{:?} at {:?}", gesture, center);
            }
        }
    }

    #[test]
    fn test_hand_size_independent_of_gesture() {
        let classifier = GestureClassifier::default();
        for size in [0.08, 0.2, 0.45] {
            let points = hand_landmarks(Gesture::OpenPalm, (0.5, 0.5), size);
            let pose = normalize(Some(&points));
            assert!((pose.hand_size - size).abs() < 1e-5);
            assert_eq!(classifier.classify(&points), Gesture::OpenPalm);
        }
    }
}
