//! Asset fetching and decoding.
//!
//! Assets are addressed by [`AssetSource`]: either a filesystem path or an
//! http(s) URL. Remote bytes can be kept in an [`AssetCache`], a directory of
//! files named by the SHA-256 of their URL. Decoders turn bytes into plain CPU
//! data ([`HdrImage`], [`ModelData`]); nothing here touches the GPU.

pub mod environment;
mod error;
pub mod hdr;
pub mod model;
pub mod source;

pub use error::AssetError;
pub use environment::{EnvLevel, PrefilteredEnvironment};
pub use hdr::HdrImage;
pub use model::{AlphaMode, ImageData, MaterialData, MeshPrimitive, ModelData, ModelSummary};
pub use source::{AssetCache, AssetSource, fetch, fetch_with_progress};

pub fn crate_info() -> &'static str {
    "glint-assets v0.1.0"
}
