//! Keyboard surface
//!
//! Show/hide animation of the layer surface hosting the keyboard.

pub mod animator;
pub mod easing;

pub use animator::{Direction, TickResult, Timestamp, Visibility, VisibilityAnimator};
