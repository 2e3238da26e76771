//! Resource management
//!
//! Handles loading and management of meshes, models, textures, and materials.

mod cubemap;
mod material;
mod mesh;
mod model;
mod model_loader;
mod texture;

pub use cubemap::*;
pub use material::*;
pub use mesh::*;
pub use model::*;
pub use model_loader::*;
pub use texture::*;
