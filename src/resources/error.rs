//! Resource loading errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to import model: {0}")]
    ModelImport(#[from] gltf::Error),
    #[error("Model contains no triangle geometry")]
    EmptyModel,
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Image has zero size")]
    EmptyImage,
    #[error("Cubemap faces must be square and equally sized (expected {expected}, got {width}x{height})")]
    FaceSizeMismatch {
        expected: u32,
        width: u32,
        height: u32,
    },
    #[error("Invalid cubemap size {0}: must be a power of two in 16..=4096")]
    InvalidCubemapSize(u32),
    #[error("Cannot render into a {0:?} cubemap")]
    UnsupportedFormat(wgpu::TextureFormat),
}

pub type ResourceResult<T> = Result<T, ResourceError>;
