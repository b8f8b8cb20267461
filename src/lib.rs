//! Gesture Tree
//!
//! A particle Christmas tree steered by hand gestures. Landmark frames are
//! classified into gestures, gestures drive a small mode machine, and every
//! element blends between its tree, exploded and message formations.

pub mod blend;
pub mod camera;
pub mod clock;
pub mod config;
pub mod experience;
pub mod formation;
pub mod gesture;
pub mod mode;
pub mod photos;
pub mod script;
pub mod text;
