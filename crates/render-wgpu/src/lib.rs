//! wgpu render backend for the viewer.
//!
//! The scene is shaded with image-based lighting into an HDR target, then a
//! chain of fullscreen passes (RGB shift, tone mapping) runs on the way to
//! the window surface.
//!
//! # Invariants
//! - Renderer never mutates scene state.
//! - Intermediate targets follow `Viewport::render_size`, so the pixel ratio
//!   cap applies to every pass.
//! - An environment is always bound; a neutral one stands in until the real
//!   map has loaded.

mod composer;
mod environment;
mod gpu;
mod model;
mod passes;
mod scene_pass;
mod shaders;

pub use composer::{Composer, PostPass, Slot, pass_slots};
pub use environment::{FALLBACK_RADIANCE, GpuEnvironment};
pub use gpu::{DEPTH_FORMAT, HDR_FORMAT, RenderTarget, Vertex};
pub use model::{GpuModel, MaterialUniforms};
pub use passes::{OutputPass, OutputUniforms, RgbShiftPass, RgbShiftUniforms, ShaderPass};
pub use scene_pass::{FrameUniforms, ScenePass};
