//! Shared types for the glint viewer.
//!
//! Everything here is renderer-agnostic: transforms use glam, the viewport
//! only knows sizes and scale factors, and configuration is plain serde.

pub mod config;
pub mod types;
pub mod viewport;

pub use config::{ConfigError, ViewerConfig};
pub use types::{Euler, Transform};
pub use viewport::Viewport;
