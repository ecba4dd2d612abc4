//! GPU backend
//!
//! Thin ownership layer over wgpu: surface, device, queue and the per-frame
//! encoder. Render passes talk to `wgpu` directly through the accessors.

pub mod types;
pub mod wgpu_backend;

pub use types::*;
pub use wgpu_backend::{DepthTarget, Frame, WgpuBackend};

use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;
