//! Debug UI for live material editing
//!
//! Widgets never touch materials directly: a moved slider yields a
//! [`UniformUpdate`], and [`broadcast`] writes it into every material of the
//! loaded model before the next frame is rendered.

mod parameters;
mod surface_gui;

pub use parameters::*;
pub use surface_gui::SurfaceGui;
