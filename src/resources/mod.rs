//! Resource management
//!
//! Handles loading of models, LDR textures, HDR environments and cubemaps.

mod cubemap;
mod error;
mod hdr;
mod mesh;
mod model;
mod texture;

pub use cubemap::*;
pub use error::*;
pub use hdr::*;
pub use mesh::*;
pub use model::*;
pub use texture::*;
