//! Surface parameters exposed in the debug UI and their propagation to materials

use glam::Vec3;

use crate::error::ViewerResult;
use crate::resources::{Material, UniformValue};

/// Which window a slider is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterWindow {
    MaterialProperties,
    Debug,
}

impl ParameterWindow {
    pub fn title(&self) -> &'static str {
        match self {
            ParameterWindow::MaterialProperties => "Material Properties",
            ParameterWindow::Debug => "Debug",
        }
    }
}

/// Field of [`SurfaceParameters`] a slider edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    RefractionIndex,
    Roughness,
    /// Component of `DebugColors`
    DebugColor(usize),
    ReflectionIntensity,
    RefractionIntensity,
}

/// One slider of the debug UI and the uniform it drives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub window: ParameterWindow,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub uniform: &'static str,
    pub field: ParameterField,
}

pub const SLIDERS: [SliderSpec; 6] = [
    SliderSpec {
        window: ParameterWindow::MaterialProperties,
        label: "Refraction Index",
        min: 1.0,
        max: 2.42,
        uniform: "RefractionIndex",
        field: ParameterField::RefractionIndex,
    },
    SliderSpec {
        window: ParameterWindow::MaterialProperties,
        label: "Roughness",
        min: 0.01,
        max: 0.5,
        uniform: "Roughness",
        field: ParameterField::Roughness,
    },
    SliderSpec {
        window: ParameterWindow::Debug,
        label: "Refl Red",
        min: 0.0,
        max: 1.0,
        uniform: "DebugColors",
        field: ParameterField::DebugColor(0),
    },
    SliderSpec {
        window: ParameterWindow::Debug,
        label: "Tran Green",
        min: 0.0,
        max: 1.0,
        uniform: "DebugColors",
        field: ParameterField::DebugColor(1),
    },
    SliderSpec {
        window: ParameterWindow::Debug,
        label: "Refl Intensity",
        min: 0.0,
        max: 1.0,
        uniform: "ReflectionIntensity",
        field: ParameterField::ReflectionIntensity,
    },
    SliderSpec {
        window: ParameterWindow::Debug,
        label: "Tran Intensity",
        min: 0.0,
        max: 1.0,
        uniform: "RefractionIntensity",
        field: ParameterField::RefractionIntensity,
    },
];

/// Sliders drawn in `window`, in display order
pub fn sliders_in(window: ParameterWindow) -> impl Iterator<Item = &'static SliderSpec> {
    SLIDERS.iter().filter(move |spec| spec.window == window)
}

/// Live UI state for the surface uniforms shared by every sub-material
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceParameters {
    pub refraction_index: f32,
    pub roughness: f32,
    pub debug_colors: Vec3,
    pub reflection_intensity: f32,
    pub refraction_intensity: f32,
}

impl Default for SurfaceParameters {
    fn default() -> Self {
        Self {
            refraction_index: 1.5,
            roughness: 0.02,
            debug_colors: Vec3::ZERO,
            reflection_intensity: 1.0,
            refraction_intensity: 1.0,
        }
    }
}

impl SurfaceParameters {
    pub fn field_mut(&mut self, field: ParameterField) -> &mut f32 {
        match field {
            ParameterField::RefractionIndex => &mut self.refraction_index,
            ParameterField::Roughness => &mut self.roughness,
            ParameterField::DebugColor(component) => &mut self.debug_colors[component.min(2)],
            ParameterField::ReflectionIntensity => &mut self.reflection_intensity,
            ParameterField::RefractionIntensity => &mut self.refraction_intensity,
        }
    }

    /// The full uniform value a slider's change produces
    pub fn update_for(&self, spec: &SliderSpec) -> UniformUpdate {
        let value: UniformValue = match spec.field {
            ParameterField::RefractionIndex => self.refraction_index.into(),
            ParameterField::Roughness => self.roughness.into(),
            ParameterField::DebugColor(_) => self.debug_colors.into(),
            ParameterField::ReflectionIntensity => self.reflection_intensity.into(),
            ParameterField::RefractionIntensity => self.refraction_intensity.into(),
        };
        UniformUpdate::new(spec.uniform, value)
    }

    /// Updates writing every parameter, used to seed materials
    pub fn all_updates(&self) -> Vec<UniformUpdate> {
        let mut updates: Vec<UniformUpdate> = Vec::new();
        for spec in &SLIDERS {
            if !updates.iter().any(|u| u.name == spec.uniform) {
                updates.push(self.update_for(spec));
            }
        }
        updates
    }
}

/// A confirmed change of one uniform, to be written into every material
#[derive(Debug, Clone, PartialEq)]
pub struct UniformUpdate {
    pub name: &'static str,
    pub value: UniformValue,
}

impl UniformUpdate {
    pub fn new(name: &'static str, value: UniformValue) -> Self {
        Self { name, value }
    }
}

/// Write each update into each material
pub fn broadcast(updates: &[UniformUpdate], materials: &mut [Material]) -> ViewerResult<()> {
    if updates.is_empty() || materials.is_empty() {
        return Ok(());
    }

    for material in materials.iter_mut() {
        for update in updates {
            material.set_uniform_value(update.name, update.value.clone())?;
        }
    }
    log::trace!(
        "Broadcast {} uniform updates to {} materials",
        updates.len(),
        materials.len()
    );
    Ok(())
}
