//! Named-uniform materials bound to a shader program

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::backend::TextureDimension;
use crate::error::{ViewerError, ViewerResult};
use crate::resources::Texture;
use crate::shader::{ShaderProgram, UniformType};

/// A value assignable to a named uniform
#[derive(Debug, Clone)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// `None` leaves the slot to the renderer's fallback texture
    Texture(Option<Arc<Texture>>),
}

impl UniformValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::Texture(Some(texture)) => match texture.dimension() {
                TextureDimension::D2 => "texture_2d",
                TextureDimension::Cube => "texture_cube",
            },
            UniformValue::Texture(None) => "texture",
        }
    }

    /// Whether this value can be stored in a uniform of type `ty`
    pub fn matches(&self, ty: UniformType) -> bool {
        match (self, ty) {
            (UniformValue::Float(_), UniformType::Float)
            | (UniformValue::Vec2(_), UniformType::Vec2)
            | (UniformValue::Vec3(_), UniformType::Vec3)
            | (UniformValue::Vec4(_), UniformType::Vec4)
            | (UniformValue::Mat4(_), UniformType::Mat4) => true,
            (UniformValue::Texture(None), UniformType::Texture2D | UniformType::TextureCube) => true,
            (UniformValue::Texture(Some(texture)), UniformType::Texture2D) => {
                texture.dimension() == TextureDimension::D2
            }
            (UniformValue::Texture(Some(texture)), UniformType::TextureCube) => {
                texture.dimension() == TextureDimension::Cube
            }
            _ => false,
        }
    }

    /// Zero, identity or unbound, depending on the type
    pub fn default_for(ty: UniformType) -> Self {
        match ty {
            UniformType::Float => UniformValue::Float(0.0),
            UniformType::Vec2 => UniformValue::Vec2(Vec2::ZERO),
            UniformType::Vec3 => UniformValue::Vec3(Vec3::ZERO),
            UniformType::Vec4 => UniformValue::Vec4(Vec4::ZERO),
            UniformType::Mat4 => UniformValue::Mat4(Mat4::IDENTITY),
            UniformType::Texture2D | UniformType::TextureCube => UniformValue::Texture(None),
        }
    }
}

impl PartialEq for UniformValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UniformValue::Float(a), UniformValue::Float(b)) => a == b,
            (UniformValue::Vec2(a), UniformValue::Vec2(b)) => a == b,
            (UniformValue::Vec3(a), UniformValue::Vec3(b)) => a == b,
            (UniformValue::Vec4(a), UniformValue::Vec4(b)) => a == b,
            (UniformValue::Mat4(a), UniformValue::Mat4(b)) => a == b,
            (UniformValue::Texture(a), UniformValue::Texture(b)) => match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Arc<Texture>> for UniformValue {
    fn from(texture: Arc<Texture>) -> Self {
        UniformValue::Texture(Some(texture))
    }
}

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a material instance; clones get a fresh one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(u64);

impl MaterialId {
    fn next() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Values for every program uniform that the material owns.
///
/// Uniforms named in `filtered` at construction belong to the renderer
/// (camera, lights, transforms) and cannot be set on the material.
#[derive(Debug)]
pub struct Material {
    id: MaterialId,
    name: Option<String>,
    program: Arc<ShaderProgram>,
    values: HashMap<String, UniformValue>,
    revision: u64,
}

impl Material {
    pub fn new(program: Arc<ShaderProgram>, filtered: &[&str]) -> Self {
        let values = program
            .uniform_names()
            .filter(|name| !filtered.contains(name))
            .filter_map(|name| {
                let info = program.uniform(name)?;
                Some((name.to_string(), UniformValue::default_for(info.ty)))
            })
            .collect();

        Self {
            id: MaterialId::next(),
            name: None,
            program,
            values,
            revision: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    /// Bumped by every successful [`Material::set_uniform_value`]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Names of the uniforms this material owns, in program order
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.program
            .uniform_names()
            .filter(|name| self.values.contains_key(*name))
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set_uniform_value(&mut self, name: &str, value: impl Into<UniformValue>) -> ViewerResult<()> {
        let value = value.into();
        let info = self
            .program
            .uniform(name)
            .filter(|_| self.values.contains_key(name))
            .ok_or_else(|| ViewerError::UnknownUniform(name.to_string()))?;

        if !value.matches(info.ty) {
            return Err(ViewerError::UniformTypeMismatch {
                name: name.to_string(),
                expected: info.ty.name(),
                found: value.type_name(),
            });
        }

        self.values.insert(name.to_string(), value);
        self.revision += 1;
        Ok(())
    }

    pub fn uniform_value(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.uniform_value(name)? {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_vec3(&self, name: &str) -> Option<Vec3> {
        match self.uniform_value(name)? {
            UniformValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_texture(&self, name: &str) -> Option<&Arc<Texture>> {
        match self.uniform_value(name)? {
            UniformValue::Texture(texture) => texture.as_ref(),
            _ => None,
        }
    }
}

impl Clone for Material {
    fn clone(&self) -> Self {
        Self {
            id: MaterialId::next(),
            name: self.name.clone(),
            program: Arc::clone(&self.program),
            values: self.values.clone(),
            revision: self.revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{Shader, ShaderStage};

    const SHADER: &str = r#"
struct Object {
    WorldMatrix: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> object: Object;

struct Surface {
    Color: vec3<f32>,
    Roughness: f32,
}
@group(1) @binding(0) var<uniform> surface: Surface;
@group(1) @binding(1) var ColorTexture: texture_2d<f32>;
@group(1) @binding(2) var EnvironmentTexture: texture_cube<f32>;
@group(1) @binding(3) var LinearSampler: sampler;

@vertex
fn vs_main(@location(0) VertexPosition: vec3<f32>) -> @builtin(position) vec4<f32> {
    return object.WorldMatrix * vec4<f32>(VertexPosition, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let albedo = textureSample(ColorTexture, LinearSampler, vec2<f32>(0.5)).rgb;
    let env = textureSample(EnvironmentTexture, LinearSampler, vec3<f32>(0.0, 1.0, 0.0)).rgb;
    return vec4<f32>(albedo * surface.Color * surface.Roughness + env, 1.0);
}
"#;

    fn program() -> Arc<ShaderProgram> {
        let vertex = Shader::from_source(ShaderStage::Vertex, "test", SHADER.into()).unwrap();
        let fragment = Shader::from_source(ShaderStage::Fragment, "test", SHADER.into()).unwrap();
        Arc::new(ShaderProgram::build(vertex, fragment).unwrap())
    }

    #[test]
    fn filtered_uniforms_are_not_owned() {
        let material = Material::new(program(), &["WorldMatrix"]);
        let names: Vec<&str> = material.uniform_names().collect();
        assert_eq!(names, vec!["Color", "Roughness", "ColorTexture", "EnvironmentTexture"]);

        let mut material = material;
        let err = material.set_uniform_value("WorldMatrix", Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, ViewerError::UnknownUniform(_)));
    }

    #[test]
    fn defaults_follow_uniform_types() {
        let material = Material::new(program(), &["WorldMatrix"]);
        assert_eq!(material.get_float("Roughness"), Some(0.0));
        assert_eq!(material.get_vec3("Color"), Some(Vec3::ZERO));
        assert_eq!(material.uniform_value("ColorTexture"), Some(&UniformValue::Texture(None)));
    }

    #[test]
    fn set_checks_types_and_bumps_revision() {
        let mut material = Material::new(program(), &["WorldMatrix"]);
        material.set_uniform_value("Roughness", 0.3f32).unwrap();
        assert_eq!(material.revision(), 1);

        let err = material.set_uniform_value("Roughness", Vec3::ONE).unwrap_err();
        assert!(matches!(err, ViewerError::UniformTypeMismatch { .. }));

        let err = material
            .set_uniform_value("EnvironmentTexture", Arc::new(Texture::white()))
            .unwrap_err();
        assert!(matches!(err, ViewerError::UniformTypeMismatch { expected: "texture_cube", .. }));

        material
            .set_uniform_value("EnvironmentTexture", Arc::new(Texture::black_cube()))
            .unwrap();
        assert_eq!(material.revision(), 2);
    }

    #[test]
    fn clones_are_independent() {
        let mut original = Material::new(program(), &["WorldMatrix"]);
        original.set_uniform_value("Roughness", 0.5f32).unwrap();

        let mut copy = original.clone();
        assert_ne!(copy.id(), original.id());
        copy.set_uniform_value("Roughness", 0.1f32).unwrap();

        assert_eq!(original.get_float("Roughness"), Some(0.5));
        assert_eq!(copy.get_float("Roughness"), Some(0.1));
        assert!(Arc::ptr_eq(copy.program(), original.program()));
    }
}
