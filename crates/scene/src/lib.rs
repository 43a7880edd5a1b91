//! Scene state for the viewer.
//!
//! # Invariants
//! - The scene holds at most one model; a second one replaces the first.
//! - All mutations flow through explicit operations and are recorded in the
//!   event log, which the app drains once per frame.
//! - Loader failures are logged here and never propagate further.

pub mod camera;
pub mod scene;

pub use camera::PerspectiveCamera;
pub use scene::{LoadEvent, LoadStatus, ModelId, Scene, SceneEvent, SceneModel, Stage};
