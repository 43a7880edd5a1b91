//! Input handling: raw window events become [`Action`]s, and pointer actions
//! drive the model rotation through a [`Tween`].
//!
//! # Invariants
//! - Pointer input is ignored until a model is present.
//! - A new pointer target re-targets from the current, not the final, rotation.
//! - Time is passed in explicitly; nothing here reads the clock.

pub mod action;
pub mod rotation;
pub mod tween;

pub use action::Action;
pub use rotation::{RotationDriver, pointer_target};
pub use tween::{Ease, Lerp, Tween};

pub fn crate_info() -> &'static str {
    "glint-input v0.1.0"
}
