//! Rendering Adapter: renderer-agnostic interface and post-processing models.
//!
//! # Invariants
//! - Renderers read the scene; they never mutate it.
//! - Every GPU post pass has a CPU reference here with the same parameters,
//!   so its behaviour can be tested without a device.

pub mod postfx;
mod renderer;

pub use postfx::{RgbShiftParams, ToneMapping, aces_filmic, rgb_shift};
pub use renderer::{DebugTextRenderer, Renderer};

pub fn crate_info() -> &'static str {
    "glint-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
