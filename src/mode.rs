//! Mode State Machine
//!
//! Owns the current [`Mode`] and the focused-photo selection. Gestures drive
//! transitions through [`ModeMachine::apply_gesture`], subject to the caption
//! dialog lock and a minimum dwell time; the legend drives them directly
//! through [`ModeMachine::select`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::gesture::Gesture;

/// Default minimum time between accepted gesture transitions
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Tree,
    Scatter,
    Focus,
    NewYear,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Tree, Mode::Scatter, Mode::Focus, Mode::NewYear];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Tree => "Tree",
            Mode::Scatter => "Scatter",
            Mode::Focus => "Focus",
            Mode::NewYear => "New Year",
        }
    }

    /// The gesture that requests this mode, for the legend
    pub fn gesture(&self) -> Gesture {
        match self {
            Mode::Tree => Gesture::Fist,
            Mode::Scatter => Gesture::OpenPalm,
            Mode::Focus => Gesture::Pinch,
            Mode::NewYear => Gesture::Yeah,
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    /// Accepts `tree`, `scatter`, `focus` and `new-year` in any case, with
    /// `_` or `-` separators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "tree" => Ok(Mode::Tree),
            "scatter" => Ok(Mode::Scatter),
            "focus" => Ok(Mode::Focus),
            "new-year" | "newyear" => Ok(Mode::NewYear),
            other => Err(format!("unknown mode '{}' (tree, scatter, focus, new-year)", other)),
        }
    }
}

/// External state a gesture transition depends on
#[derive(Clone, Copy, Debug, Default)]
pub struct GestureContext {
    /// A caption dialog is open
    pub editing: bool,
    /// Committed photos on the tree
    pub photo_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Caption dialog open
    Editing,
    /// No gesture this frame
    NoGesture,
    /// Too soon after the previous accepted transition
    Debounced { elapsed_ms: u64 },
    /// Already in the requested mode
    AlreadyActive,
    /// PINCH with nothing to focus
    NoPhotos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Accepted { from: Mode, to: Mode },
    Rejected { reason: Rejection },
}

impl Transition {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Transition::Accepted { .. })
    }

    fn rejected(reason: Rejection) -> Self {
        Transition::Rejected { reason }
    }
}

pub struct ModeMachine {
    mode: Mode,
    focus: Option<usize>,
    last_transition_ms: Option<u64>,
    debounce_ms: u64,
    rng: StdRng,
}

impl ModeMachine {
    pub fn new(debounce_ms: u64) -> Self {
        Self::with_rng(debounce_ms, StdRng::from_entropy())
    }

    /// Reproducible focus selection
    pub fn with_seed(debounce_ms: u64, seed: u64) -> Self {
        Self::with_rng(debounce_ms, StdRng::seed_from_u64(seed))
    }

    fn with_rng(debounce_ms: u64, rng: StdRng) -> Self {
        Self {
            mode: Mode::Tree,
            focus: None,
            last_transition_ms: None,
            debounce_ms,
            rng,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Index of the focused photo, if any
    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    /// Time of the last accepted gesture transition
    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_transition_ms
    }

    /// Apply a classified gesture observed at `now_ms`
    pub fn apply_gesture(&mut self, gesture: Gesture, now_ms: u64, ctx: GestureContext) -> Transition {
        if ctx.editing {
            return Transition::rejected(Rejection::Editing);
        }

        let target = match gesture {
            Gesture::None => return Transition::rejected(Rejection::NoGesture),
            Gesture::Fist => Mode::Tree,
            Gesture::OpenPalm => Mode::Scatter,
            Gesture::Pinch => Mode::Focus,
            Gesture::Yeah => Mode::NewYear,
        };

        if let Some(last) = self.last_transition_ms {
            let elapsed_ms = now_ms.saturating_sub(last);
            if elapsed_ms < self.debounce_ms {
                return Transition::rejected(Rejection::Debounced { elapsed_ms });
            }
        }

        // FOCUS with nothing selected (focused photo was removed) re-picks
        let refocus = target == Mode::Focus && self.focus.is_none();
        if self.mode == target && !refocus {
            return Transition::rejected(Rejection::AlreadyActive);
        }

        if target == Mode::Focus {
            if ctx.photo_count == 0 {
                return Transition::rejected(Rejection::NoPhotos);
            }
            self.focus = Some(self.rng.gen_range(0..ctx.photo_count));
        } else {
            self.focus = None;
        }

        let from = self.mode;
        self.mode = target;
        self.last_transition_ms = Some(now_ms);
        info!(
            from = from.label(),
            to = target.label(),
            gesture = gesture.label(),
            focus = ?self.focus,
            at_ms = now_ms,
            "Mode transition"
        );
        Transition::Accepted { from, to: target }
    }

    /// Manual selection from the legend. Bypasses the debounce and the
    /// caption lock and leaves the focus selection alone.
    pub fn select(&mut self, mode: Mode) -> Transition {
        if self.mode == mode {
            return Transition::rejected(Rejection::AlreadyActive);
        }
        let from = self.mode;
        self.mode = mode;
        info!(from = from.label(), to = mode.label(), "Mode selected manually");
        Transition::Accepted { from, to: mode }
    }

    /// Keep the focus index pointing at the same photo after a removal
    pub fn photo_removed(&mut self, index: usize, remaining: usize) {
        self.focus = match self.focus {
            Some(f) if f == index => None,
            Some(f) if f > index => Some(f - 1),
            other => other,
        };
        if matches!(self.focus, Some(f) if f >= remaining) {
            self.focus = None;
        }
        debug!(index, remaining, focus = ?self.focus, "Photo removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(photo_count: usize) -> GestureContext {
        GestureContext { editing: false, photo_count }
    }

    fn machine() -> ModeMachine {
        ModeMachine::with_seed(DEFAULT_DEBOUNCE_MS, 7)
    }

    #[test]
    fn test_parse_mode_names() {
        assert_eq!("tree".parse::<Mode>(), Ok(Mode::Tree));
        assert_eq!("NEW_YEAR".parse::<Mode>(), Ok(Mode::NewYear));
        assert_eq!("new-year".parse::<Mode>(), Ok(Mode::NewYear));
        assert_eq!(" Scatter ".parse::<Mode>(), Ok(Mode::Scatter));
        assert!("sparkle".parse::<Mode>().is_err());
    }

    #[test]
    fn test_starts_in_tree() {
        let m = machine();
        assert_eq!(m.mode(), Mode::Tree);
        assert_eq!(m.focus(), None);
        assert_eq!(m.last_transition_ms(), None);
    }

    #[test]
    fn test_end_to_end_gesture_stream() {
        let mut m = machine();

        let t0 = m.apply_gesture(Gesture::OpenPalm, 0, ctx(0));
        assert_eq!(t0, Transition::Accepted { from: Mode::Tree, to: Mode::Scatter });

        let t1 = m.apply_gesture(Gesture::OpenPalm, 200, ctx(0));
        assert!(!t1.is_accepted());
        assert_eq!(m.mode(), Mode::Scatter);

        let t2 = m.apply_gesture(Gesture::Fist, 1100, ctx(0));
        assert_eq!(t2, Transition::Accepted { from: Mode::Scatter, to: Mode::Tree });
    }

    #[test]
    fn test_debounce_window() {
        let mut m = machine();
        assert!(m.apply_gesture(Gesture::OpenPalm, 0, ctx(0)).is_accepted());

        let second = m.apply_gesture(Gesture::Yeah, 500, ctx(0));
        assert_eq!(
            second,
            Transition::Rejected { reason: Rejection::Debounced { elapsed_ms: 500 } }
        );
        assert_eq!(m.mode(), Mode::Scatter);
        // Rejections never move the clock
        assert_eq!(m.last_transition_ms(), Some(0));

        assert!(m.apply_gesture(Gesture::Yeah, 1000, ctx(0)).is_accepted());
        assert_eq!(m.mode(), Mode::NewYear);
    }

    #[test]
    fn test_editing_lock() {
        let mut m = machine();
        let editing = GestureContext { editing: true, photo_count: 3 };
        for (i, gesture) in Gesture::ALL.into_iter().enumerate() {
            let t = m.apply_gesture(gesture, 10_000 * (i as u64 + 1), editing);
            assert_eq!(t, Transition::Rejected { reason: Rejection::Editing });
        }
        assert_eq!(m.mode(), Mode::Tree);
        assert_eq!(m.last_transition_ms(), None);
    }

    #[test]
    fn test_pinch_without_photos_is_ignored() {
        let mut m = machine();
        let t = m.apply_gesture(Gesture::Pinch, 0, ctx(0));
        assert_eq!(t, Transition::Rejected { reason: Rejection::NoPhotos });
        assert_eq!(m.mode(), Mode::Tree);
        assert_eq!(m.last_transition_ms(), None);
    }

    #[test]
    fn test_repeated_pinch_keeps_focus() {
        let mut m = machine();
        assert!(m.apply_gesture(Gesture::Pinch, 0, ctx(10)).is_accepted());
        let focus = m.focus();
        assert!(matches!(focus, Some(i) if i < 10));

        for k in 1..20 {
            m.apply_gesture(Gesture::Pinch, k * 2000, ctx(10));
            assert_eq!(m.focus(), focus);
        }
    }

    #[test]
    fn test_leaving_focus_clears_selection() {
        let mut m = machine();
        m.apply_gesture(Gesture::Pinch, 0, ctx(3));
        assert!(m.focus().is_some());
        m.apply_gesture(Gesture::Yeah, 1500, ctx(3));
        assert_eq!(m.focus(), None);
    }

    #[test]
    fn test_manual_select_bypasses_debounce_and_lock() {
        let mut m = machine();
        m.apply_gesture(Gesture::Pinch, 0, ctx(2));
        let focus = m.focus();

        let t = m.select(Mode::NewYear);
        assert_eq!(t, Transition::Accepted { from: Mode::Focus, to: Mode::NewYear });
        // Focus untouched, debounce clock untouched
        assert_eq!(m.focus(), focus);
        assert_eq!(m.last_transition_ms(), Some(0));
    }

    #[test]
    fn test_focus_follows_removal() {
        let mut m = machine();
        m.apply_gesture(Gesture::Pinch, 0, ctx(5));
        let f = m.focus().unwrap();

        if f > 0 {
            m.photo_removed(0, 4);
            assert_eq!(m.focus(), Some(f - 1));
        } else {
            m.photo_removed(0, 4);
            assert_eq!(m.focus(), None);
        }
    }

    #[test]
    fn test_pinch_refocuses_after_focused_photo_removed() {
        let mut m = machine();
        m.apply_gesture(Gesture::Pinch, 0, ctx(3));
        let f = m.focus().unwrap();
        m.photo_removed(f, 2);
        assert_eq!(m.mode(), Mode::Focus);
        assert_eq!(m.focus(), None);

        let t = m.apply_gesture(Gesture::Pinch, 1500, ctx(2));
        assert_eq!(t, Transition::Accepted { from: Mode::Focus, to: Mode::Focus });
        assert!(matches!(m.focus(), Some(i) if i < 2));
        assert_eq!(m.last_transition_ms(), Some(1500));

        m.photo_removed(0, 1);
        m.photo_removed(0, 0);
        let t = m.apply_gesture(Gesture::Pinch, 3000, ctx(0));
        assert_eq!(t, Transition::Rejected { reason: Rejection::NoPhotos });
        assert_eq!(m.mode(), Mode::Focus);
    }

    #[test]
    fn test_focus_distribution_covers_all_photos() {
        let mut seen = [false; 4];
        for seed in 0..200 {
            let mut m = ModeMachine::with_seed(DEFAULT_DEBOUNCE_MS, seed);
            m.apply_gesture(Gesture::Pinch, 0, ctx(4));
            seen[m.focus().unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
