//! WGSL shader loading, validation and program reflection
//!
//! A [`Shader`] is one stage assembled from one or more source files. Two
//! shaders form a [`ShaderProgram`], which knows every named uniform the
//! stages use: uniform block members, textures and vertex inputs.

mod block;
mod reflect;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use block::UniformBlockData;
pub use reflect::{
    SamplerBinding, TextureBinding, UniformBlock, UniformMember, UniformType, VertexInput,
};

use crate::error::{ViewerError, ViewerResult};

/// Pipeline stage of a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point every shader of this stage must define
    pub fn entry_point(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }

    fn naga(&self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// Assembles a shader stage from source files, concatenated in order
#[derive(Debug, Clone)]
pub struct ShaderLoader {
    stage: ShaderStage,
    root: PathBuf,
}

impl ShaderLoader {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            root: PathBuf::new(),
        }
    }

    /// Directory the paths passed to [`ShaderLoader::load`] are relative to
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn load<P: AsRef<Path>>(&self, paths: &[P]) -> ViewerResult<Shader> {
        let mut source = String::new();
        let mut labels = Vec::with_capacity(paths.len());

        for path in paths {
            let full_path = self.root.join(path.as_ref());
            let text = std::fs::read_to_string(&full_path)
                .map_err(|e| ViewerError::io(&full_path, e))?;
            source.push_str(&text);
            source.push('\n');
            labels.push(path.as_ref().display().to_string());
        }

        log::debug!("Loaded {:?} shader from {}", self.stage, labels.join(" + "));
        Shader::from_source(self.stage, &labels.join("+"), source)
    }
}

/// A parsed and validated shader stage
pub struct Shader {
    stage: ShaderStage,
    label: String,
    source: String,
    module: naga::Module,
    info: naga::valid::ModuleInfo,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("stage", &self.stage)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Shader {
    pub fn from_source(stage: ShaderStage, label: &str, source: String) -> ViewerResult<Self> {
        let module = naga::front::wgsl::parse_str(&source).map_err(|e| ViewerError::ShaderParse {
            path: label.to_string(),
            message: e.emit_to_string(&source),
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator
            .validate(&module)
            .map_err(|e| ViewerError::ShaderValidation {
                message: format!("{}: {}", label, e),
            })?;

        Ok(Self {
            stage,
            label: label.to_string(),
            source,
            module,
            info,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u64);

/// Where a named uniform lives inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    /// Index into [`ShaderProgram::blocks`] and the member's byte offset
    Member { block: usize, offset: u32 },
    /// Index into [`ShaderProgram::textures`]
    Texture { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformInfo {
    pub ty: UniformType,
    pub location: UniformLocation,
}

/// Linked vertex and fragment stages with their merged reflection
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    vertex_source: String,
    fragment_source: String,
    blocks: Vec<Arc<UniformBlock>>,
    textures: Vec<TextureBinding>,
    samplers: Vec<SamplerBinding>,
    vertex_inputs: Vec<VertexInput>,
    uniforms: HashMap<String, UniformInfo>,
    names: Vec<String>,
}

impl ShaderProgram {
    pub fn build(vertex: Shader, fragment: Shader) -> ViewerResult<Self> {
        for (shader, expected) in [(&vertex, ShaderStage::Vertex), (&fragment, ShaderStage::Fragment)] {
            if shader.stage != expected {
                return Err(ViewerError::ShaderValidation {
                    message: format!("{} is a {:?} shader, expected {:?}", shader.label, shader.stage, expected),
                });
            }
        }

        let vertex_reflection = reflect::reflect_stage(
            &vertex.module,
            &vertex.info,
            vertex.stage.naga(),
            vertex.stage.entry_point(),
        )?;
        let fragment_reflection = reflect::reflect_stage(
            &fragment.module,
            &fragment.info,
            fragment.stage.naga(),
            fragment.stage.entry_point(),
        )?;
        let merged = reflect::merge_stages(vertex_reflection, fragment_reflection)?;

        let mut uniforms = HashMap::new();
        let mut names = Vec::new();
        let mut insert = |name: &str, info: UniformInfo| -> ViewerResult<()> {
            if uniforms.insert(name.to_string(), info).is_some() {
                return Err(ViewerError::ShaderValidation {
                    message: format!("Uniform {} is declared more than once", name),
                });
            }
            names.push(name.to_string());
            Ok(())
        };

        for (block_index, block) in merged.blocks.iter().enumerate() {
            for member in &block.members {
                insert(
                    &member.name,
                    UniformInfo {
                        ty: member.ty,
                        location: UniformLocation::Member {
                            block: block_index,
                            offset: member.offset,
                        },
                    },
                )?;
            }
        }
        for (index, texture) in merged.textures.iter().enumerate() {
            let ty = match texture.dimension {
                crate::backend::TextureDimension::D2 => UniformType::Texture2D,
                crate::backend::TextureDimension::Cube => UniformType::TextureCube,
            };
            insert(
                &texture.name,
                UniformInfo {
                    ty,
                    location: UniformLocation::Texture { index },
                },
            )?;
        }

        let label = format!("{} | {}", vertex.label, fragment.label);
        log::info!(
            "Built shader program [{}]: {} uniforms, {} blocks, {} textures",
            label,
            names.len(),
            merged.blocks.len(),
            merged.textures.len()
        );

        Ok(Self {
            id: ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed)),
            label,
            vertex_source: vertex.source,
            fragment_source: fragment.source,
            blocks: merged.blocks.into_iter().map(Arc::new).collect(),
            textures: merged.textures,
            samplers: merged.samplers,
            vertex_inputs: merged.vertex_inputs,
            uniforms,
            names,
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn uniform(&self, name: &str) -> Option<UniformInfo> {
        self.uniforms.get(name).copied()
    }

    /// Uniform names in block order, then textures
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn blocks(&self) -> &[Arc<UniformBlock>] {
        &self.blocks
    }

    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }

    pub fn samplers(&self) -> &[SamplerBinding] {
        &self.samplers
    }

    pub fn vertex_inputs(&self) -> &[VertexInput] {
        &self.vertex_inputs
    }

    pub fn vertex_input(&self, name: &str) -> Option<&VertexInput> {
        self.vertex_inputs.iter().find(|input| input.name == name)
    }

    /// Bind group indices used by any resource, ascending
    pub fn groups(&self) -> Vec<u32> {
        let mut groups: Vec<u32> = self
            .blocks
            .iter()
            .map(|b| b.group)
            .chain(self.textures.iter().map(|t| t.group))
            .chain(self.samplers.iter().map(|s| s.group))
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct Camera {
    ViewProjMatrix: mat4x4<f32>,
    CameraPosition: vec3<f32>,
}
@group(0) @binding(0) var<uniform> camera: Camera;

struct VertexInput {
    @location(0) VertexPosition: vec3<f32>,
    @location(3) VertexTexCoord: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
    return camera.ViewProjMatrix * vec4<f32>(in.VertexPosition, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
struct Camera {
    ViewProjMatrix: mat4x4<f32>,
    CameraPosition: vec3<f32>,
}
@group(0) @binding(0) var<uniform> camera: Camera;

struct Surface {
    Color: vec3<f32>,
    Roughness: f32,
}
@group(1) @binding(0) var<uniform> surface: Surface;
@group(1) @binding(1) var ColorTexture: texture_2d<f32>;
@group(1) @binding(2) var ColorSampler: sampler;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let albedo = textureSample(ColorTexture, ColorSampler, vec2<f32>(0.5)).rgb * surface.Color;
    return vec4<f32>(albedo * surface.Roughness + camera.CameraPosition, 1.0);
}
"#;

    fn program() -> ShaderProgram {
        let vertex = Shader::from_source(ShaderStage::Vertex, "vertex", VERTEX.into()).unwrap();
        let fragment = Shader::from_source(ShaderStage::Fragment, "fragment", FRAGMENT.into()).unwrap();
        ShaderProgram::build(vertex, fragment).unwrap()
    }

    #[test]
    fn reflects_blocks_textures_and_inputs() {
        let program = program();
        let names: Vec<&str> = program.uniform_names().collect();
        assert_eq!(
            names,
            vec!["ViewProjMatrix", "CameraPosition", "Color", "Roughness", "ColorTexture"]
        );

        let roughness = program.uniform("Roughness").unwrap();
        assert_eq!(roughness.ty, UniformType::Float);
        assert_eq!(roughness.location, UniformLocation::Member { block: 1, offset: 12 });

        assert_eq!(program.uniform("ColorTexture").unwrap().ty, UniformType::Texture2D);
        assert_eq!(program.samplers().len(), 1);
        assert_eq!(program.vertex_input("VertexTexCoord").unwrap().location, 3);
        assert_eq!(program.groups(), vec![0, 1]);
    }

    #[test]
    fn shared_block_is_visible_to_both_stages() {
        let program = program();
        let camera = &program.blocks()[0];
        assert_eq!(camera.name, "camera");
        assert_eq!(camera.visibility, crate::backend::ShaderStageFlags::VERTEX_FRAGMENT);
        assert_eq!(camera.size, 80);
    }

    #[test]
    fn parse_errors_carry_the_label() {
        let err = Shader::from_source(ShaderStage::Vertex, "broken.wgsl", "fn (".into()).unwrap_err();
        assert!(matches!(err, ViewerError::ShaderParse { ref path, .. } if path == "broken.wgsl"));
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let vertex = Shader::from_source(ShaderStage::Vertex, "vertex", VERTEX.into()).unwrap();
        let fragment = Shader::from_source(ShaderStage::Fragment, "not-fragment", VERTEX.into()).unwrap();
        let err = ShaderProgram::build(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("fs_main"));
    }

    #[test]
    fn conflicting_block_layouts_are_rejected() {
        let other_fragment = FRAGMENT.replace(
            "    ViewProjMatrix: mat4x4<f32>,\n    CameraPosition: vec3<f32>,",
            "    CameraPosition: vec3<f32>,\n    ViewProjMatrix: mat4x4<f32>,",
        );
        assert_ne!(other_fragment, FRAGMENT);
        let vertex = Shader::from_source(ShaderStage::Vertex, "vertex", VERTEX.into()).unwrap();
        let fragment = Shader::from_source(ShaderStage::Fragment, "fragment", other_fragment).unwrap();
        let err = ShaderProgram::build(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("differs between stages"), "{err}");
    }

    #[test]
    fn loader_reports_missing_files() {
        let err = ShaderLoader::new(ShaderStage::Vertex)
            .with_root("definitely-missing")
            .load(&["a.wgsl"])
            .unwrap_err();
        assert!(matches!(err, ViewerError::Io { .. }));
    }
}
