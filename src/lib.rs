//! Reflectance Lab - lighting model and environment mapping demos on wgpu
//!
//! - Phong, Cook-Torrance and toon reflectance on glTF models
//! - Equirectangular HDR to cubemap conversion with a mipmapped result
//! - Skybox and refractive glass shading against the cubemap
//! - Free-fly camera and an egui control panel
//!
//! Scene objects are `bevy_ecs` entities; passes read them through
//! [`scene::Scene::draw_list`].

pub mod app;
pub mod backend;
pub mod config;
pub mod egui_integration;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod shading;
pub mod window;

pub use app::{run, AppContext, DemoError, DemoHandler, RunOptions};
pub use backend::wgpu_backend::WgpuBackend;
pub use config::DemoArgs;
pub use egui_integration::WgpuEguiIntegration;
pub use window::{Window, WindowConfig};
