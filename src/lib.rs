//! Scene Viewer - an interactive PBR model viewer with live material tweaking
//!
//! The viewer loads an OBJ model whose sub-materials are all cloned from one
//! default PBR material, draws it over an HDR skybox and exposes the surface
//! parameters in an egui debug UI. Slider changes are broadcast to every
//! sub-material before the next frame.
//!
//! # Layers
//! - [`backend`]: handle-based GPU abstraction with a wgpu implementation and a
//!   recording dummy used in tests
//! - [`shader`]: WGSL loading and naga reflection
//! - [`resources`]: named-uniform materials, textures, cubemaps, meshes and the OBJ loader
//! - [`scene`]: camera, lights, scene graph and visitors
//! - [`renderer`]: ordered render passes over the nodes queued each frame
//! - [`ui`]: surface parameters and their propagation to materials
//! - [`application`]: the lifecycle tying everything together

use std::path::PathBuf;

pub mod application;
pub mod args;
pub mod backend;
pub mod egui_integration;
pub mod error;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod ui;
pub mod window;

pub use application::{ApplicationState, SceneViewerApplication};
pub use args::ViewerArgs;
pub use backend::wgpu_backend::WgpuBackend;
pub use egui_integration::WgpuEguiIntegration;
pub use error::{ViewerError, ViewerResult};
pub use renderer::Renderer;

/// Configuration for the viewer window and assets
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Directory holding `shaders/` and `models/`
    pub asset_root: PathBuf,
    /// Exit after this many frames
    pub max_frames: Option<u64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Scene Viewer demo".to_string(),
            width: 1024,
            height: 1024,
            vsync: true,
            asset_root: PathBuf::from("."),
            max_frames: None,
        }
    }
}
