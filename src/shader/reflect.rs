//! Resource and vertex input reflection from validated naga modules

use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, ImageClass, ImageDimension, ScalarKind, TypeInner, VectorSize};

use crate::backend::{ShaderStageFlags, TextureDimension};
use crate::error::{ViewerError, ViewerResult};

/// Type of a named uniform as seen by materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Texture2D,
    TextureCube,
}

impl UniformType {
    pub fn name(&self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Mat4 => "mat4",
            UniformType::Texture2D => "texture_2d",
            UniformType::TextureCube => "texture_cube",
        }
    }

    /// Bytes written into a uniform block, zero for textures
    pub fn size(&self) -> u32 {
        match self {
            UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
            UniformType::Texture2D | UniformType::TextureCube => 0,
        }
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, UniformType::Texture2D | UniformType::TextureCube)
    }
}

/// Member of a uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub ty: UniformType,
    pub offset: u32,
}

/// A `var<uniform>` struct bound at `@group/@binding`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u32,
    pub members: Vec<UniformMember>,
    pub visibility: ShaderStageFlags,
}

impl UniformBlock {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A sampled texture global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub dimension: TextureDimension,
    pub visibility: ShaderStageFlags,
}

/// A sampler global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub visibility: ShaderStageFlags,
}

/// A `@location` input of the vertex entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
}

/// Everything one stage's entry point uses
#[derive(Debug, Default)]
pub(crate) struct StageReflection {
    pub blocks: Vec<UniformBlock>,
    pub textures: Vec<TextureBinding>,
    pub samplers: Vec<SamplerBinding>,
    pub vertex_inputs: Vec<VertexInput>,
}

fn member_type(inner: &TypeInner) -> Option<UniformType> {
    match *inner {
        TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Float => Some(UniformType::Float),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => Some(match size {
            VectorSize::Bi => UniformType::Vec2,
            VectorSize::Tri => UniformType::Vec3,
            VectorSize::Quad => UniformType::Vec4,
        }),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        } => Some(UniformType::Mat4),
        _ => None,
    }
}

fn unsupported(what: String) -> ViewerError {
    ViewerError::ShaderValidation { message: what }
}

pub(crate) fn reflect_stage(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    stage: naga::ShaderStage,
    entry_point: &str,
) -> ViewerResult<StageReflection> {
    let ep_index = module
        .entry_points
        .iter()
        .position(|ep| ep.name == entry_point && ep.stage == stage)
        .ok_or_else(|| ViewerError::ShaderValidation {
            message: format!("Entry point '{}' not found for stage {:?}", entry_point, stage),
        })?;
    let ep_info = info.get_entry_point(ep_index);
    let visibility = match stage {
        naga::ShaderStage::Vertex => ShaderStageFlags::VERTEX,
        _ => ShaderStageFlags::FRAGMENT,
    };

    let mut reflection = StageReflection::default();

    for (handle, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        if ep_info[handle].is_empty() {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        let inner = &module.types[var.ty].inner;

        match (var.space, inner) {
            (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                let members = members
                    .iter()
                    .map(|m| {
                        let member_name = m.name.clone().unwrap_or_default();
                        let ty = member_type(&module.types[m.ty].inner).ok_or_else(|| {
                            unsupported(format!(
                                "Uniform member {}.{} has an unsupported type",
                                name, member_name
                            ))
                        })?;
                        Ok(UniformMember {
                            name: member_name,
                            ty,
                            offset: m.offset,
                        })
                    })
                    .collect::<ViewerResult<Vec<_>>>()?;
                reflection.blocks.push(UniformBlock {
                    name,
                    group: binding.group,
                    binding: binding.binding,
                    size: *span,
                    members,
                    visibility,
                });
            }
            (AddressSpace::Handle, TypeInner::Image { dim, arrayed, class }) => {
                let dimension = match (*dim, *arrayed) {
                    (ImageDimension::D2, false) => TextureDimension::D2,
                    (ImageDimension::Cube, false) => TextureDimension::Cube,
                    _ => return Err(unsupported(format!("Texture {} has an unsupported dimension", name))),
                };
                if !matches!(class, ImageClass::Sampled { kind: ScalarKind::Float, multi: false }) {
                    return Err(unsupported(format!("Texture {} must be a float sampled texture", name)));
                }
                reflection.textures.push(TextureBinding {
                    name,
                    group: binding.group,
                    binding: binding.binding,
                    dimension,
                    visibility,
                });
            }
            (AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                reflection.samplers.push(SamplerBinding {
                    name,
                    group: binding.group,
                    binding: binding.binding,
                    visibility,
                });
            }
            _ => {
                return Err(unsupported(format!(
                    "Global {} at @group({}) @binding({}) is not a uniform block, texture or sampler",
                    name, binding.group, binding.binding
                )))
            }
        }
    }

    if stage == naga::ShaderStage::Vertex {
        let function = &module.entry_points[ep_index].function;
        for argument in &function.arguments {
            match &argument.binding {
                Some(Binding::Location { location, .. }) => reflection.vertex_inputs.push(VertexInput {
                    name: argument.name.clone().unwrap_or_default(),
                    location: *location,
                }),
                Some(Binding::BuiltIn(_)) => {}
                None => {
                    if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                        for member in members {
                            if let Some(Binding::Location { location, .. }) = &member.binding {
                                reflection.vertex_inputs.push(VertexInput {
                                    name: member.name.clone().unwrap_or_default(),
                                    location: *location,
                                });
                            }
                        }
                    }
                }
            }
        }
        reflection.vertex_inputs.sort_by_key(|input| input.location);
    }

    Ok(reflection)
}

/// Combine vertex and fragment reflections, widening visibility of shared bindings
pub(crate) fn merge_stages(
    vertex: StageReflection,
    fragment: StageReflection,
) -> ViewerResult<StageReflection> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Block,
        Texture,
        Sampler,
    }

    let mut slots: BTreeMap<(u32, u32), (Kind, String)> = BTreeMap::new();
    let mut claim = |group: u32, binding: u32, kind: Kind, name: &str| -> ViewerResult<bool> {
        match slots.get(&(group, binding)) {
            Some((existing_kind, existing_name)) => {
                if *existing_kind != kind || existing_name != name {
                    return Err(ViewerError::ShaderValidation {
                        message: format!(
                            "Conflicting declarations at @group({}) @binding({}): {} and {}",
                            group, binding, existing_name, name
                        ),
                    });
                }
                Ok(false)
            }
            None => {
                slots.insert((group, binding), (kind, name.to_string()));
                Ok(true)
            }
        }
    };

    let mut merged = StageReflection {
        vertex_inputs: vertex.vertex_inputs,
        ..Default::default()
    };

    for block in vertex.blocks.into_iter().chain(fragment.blocks) {
        if claim(block.group, block.binding, Kind::Block, &block.name)? {
            merged.blocks.push(block);
        } else if let Some(existing) = merged
            .blocks
            .iter_mut()
            .find(|b| b.group == block.group && b.binding == block.binding)
        {
            if existing.members != block.members || existing.size != block.size {
                return Err(ViewerError::ShaderValidation {
                    message: format!("Uniform block {} differs between stages", block.name),
                });
            }
            existing.visibility |= block.visibility;
        }
    }

    for texture in vertex.textures.into_iter().chain(fragment.textures) {
        if claim(texture.group, texture.binding, Kind::Texture, &texture.name)? {
            merged.textures.push(texture);
        } else if let Some(existing) = merged
            .textures
            .iter_mut()
            .find(|t| t.group == texture.group && t.binding == texture.binding)
        {
            if existing.dimension != texture.dimension {
                return Err(ViewerError::ShaderValidation {
                    message: format!("Texture {} differs between stages", texture.name),
                });
            }
            existing.visibility |= texture.visibility;
        }
    }

    for sampler in vertex.samplers.into_iter().chain(fragment.samplers) {
        if claim(sampler.group, sampler.binding, Kind::Sampler, &sampler.name)? {
            merged.samplers.push(sampler);
        } else if let Some(existing) = merged
            .samplers
            .iter_mut()
            .find(|s| s.group == sampler.group && s.binding == sampler.binding)
        {
            existing.visibility |= sampler.visibility;
        }
    }

    merged.blocks.sort_by_key(|b| (b.group, b.binding));
    merged.textures.sort_by_key(|t| (t.group, t.binding));
    merged.samplers.sort_by_key(|s| (s.group, s.binding));
    Ok(merged)
}
