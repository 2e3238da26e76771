//! GPU-side caches for textures, meshes, materials and the depth target

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{ViewerError, ViewerResult};
use crate::resources::{GpuTexture, MaterialId, Material, Mesh, ModelId, Texture, TextureId, UniformValue};
use crate::shader::{ShaderProgram, UniformBlockData};

pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// One entry of a bind group, as declared by a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupResource {
    /// Index into [`ShaderProgram::blocks`]
    Block(usize),
    /// Index into [`ShaderProgram::textures`]
    Texture(usize),
    Sampler,
}

/// Resources a program declares in one bind group, ordered by binding
pub(crate) fn group_resources(program: &ShaderProgram, group: u32) -> Vec<(u32, GroupResource)> {
    let mut resources: Vec<(u32, GroupResource)> = program
        .blocks()
        .iter()
        .enumerate()
        .filter(|(_, b)| b.group == group)
        .map(|(i, b)| (b.binding, GroupResource::Block(i)))
        .chain(
            program
                .textures()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.group == group)
                .map(|(i, t)| (t.binding, GroupResource::Texture(i))),
        )
        .chain(
            program
                .samplers()
                .iter()
                .filter(|s| s.group == group)
                .map(|s| (s.binding, GroupResource::Sampler)),
        )
        .collect();
    resources.sort_by_key(|(binding, _)| *binding);
    resources
}

/// One layout per group index up to the highest used; gaps get empty layouts
pub(crate) fn create_bind_group_layouts<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    program: &ShaderProgram,
) -> ViewerResult<Vec<BindGroupLayoutHandle>> {
    let group_count = program.groups().last().map_or(0, |g| g + 1);
    let mut layouts = Vec::with_capacity(group_count as usize);

    for group in 0..group_count {
        let entries: Vec<BindGroupLayoutEntry> = group_resources(program, group)
            .into_iter()
            .map(|(binding, resource)| match resource {
                GroupResource::Block(i) => BindGroupLayoutEntry {
                    binding,
                    visibility: program.blocks()[i].visibility,
                    ty: BindingType::UniformBuffer,
                },
                GroupResource::Texture(i) => {
                    let texture = &program.textures()[i];
                    BindGroupLayoutEntry {
                        binding,
                        visibility: texture.visibility,
                        ty: BindingType::Texture {
                            view_dimension: texture.dimension,
                        },
                    }
                }
                GroupResource::Sampler => BindGroupLayoutEntry {
                    binding,
                    visibility: program
                        .samplers()
                        .iter()
                        .find(|s| s.group == group && s.binding == binding)
                        .map_or(ShaderStageFlags::FRAGMENT, |s| s.visibility),
                    ty: BindingType::Sampler,
                },
            })
            .collect();
        layouts.push(backend.create_bind_group_layout(&entries)?);
    }

    Ok(layouts)
}

pub(crate) fn uniform_buffer<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    label: &str,
    size: u32,
) -> ViewerResult<BufferHandle> {
    Ok(backend.create_buffer(&BufferDescriptor {
        label: Some(label.to_string()),
        size: size.max(16) as u64,
        usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
    })?)
}

/// Vertex and index buffers of one mesh
#[derive(Debug, Clone, Copy)]
pub(crate) struct GpuMesh {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

/// Uniform buffers and bind groups holding one material's values
#[derive(Debug)]
pub(crate) struct GpuMaterial {
    revision: u64,
    buffers: Vec<(usize, BufferHandle)>,
    /// Entries each bind group was created from
    entries: Vec<Vec<(u32, BindGroupEntry)>>,
    pub bind_groups: Vec<(u32, BindGroupHandle)>,
}

struct DepthTarget {
    texture: TextureHandle,
    view: TextureViewHandle,
    width: u32,
    height: u32,
}

/// Backend objects shared by every pass
#[derive(Default)]
pub(crate) struct GpuResources {
    textures: HashMap<TextureId, GpuTexture>,
    meshes: HashMap<(ModelId, usize), GpuMesh>,
    materials: HashMap<MaterialId, GpuMaterial>,
    sampler: Option<SamplerHandle>,
    white: Option<GpuTexture>,
    black_cube: Option<GpuTexture>,
    depth: Option<DepthTarget>,
}

impl GpuResources {
    /// Trilinear repeating sampler bound to every sampler slot
    pub fn sampler<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> ViewerResult<SamplerHandle> {
        if let Some(sampler) = self.sampler {
            return Ok(sampler);
        }
        let sampler = backend.create_sampler(&SamplerDescriptor::repeat("linear_repeat"))?;
        self.sampler = Some(sampler);
        Ok(sampler)
    }

    pub fn texture<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        texture: &Texture,
    ) -> ViewerResult<TextureViewHandle> {
        if let Some(gpu) = self.textures.get(&texture.id()) {
            return Ok(gpu.view);
        }
        let gpu = GpuTexture::create(backend, texture)?;
        log::debug!("Uploaded texture {} ({} mips)", texture.name(), texture.mip_count());
        self.textures.insert(texture.id(), gpu);
        Ok(gpu.view)
    }

    /// Neutral texture for unbound slots: white 2D or black cube
    pub fn fallback<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        dimension: TextureDimension,
    ) -> ViewerResult<TextureViewHandle> {
        let slot = match dimension {
            TextureDimension::D2 => &mut self.white,
            TextureDimension::Cube => &mut self.black_cube,
        };
        if let Some(gpu) = slot {
            return Ok(gpu.view);
        }
        let texture = match dimension {
            TextureDimension::D2 => Texture::white(),
            TextureDimension::Cube => Texture::black_cube(),
        };
        let gpu = GpuTexture::create(backend, &texture)?;
        *slot = Some(gpu);
        Ok(gpu.view)
    }

    pub fn mesh<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        model: ModelId,
        index: usize,
        mesh: &Mesh,
    ) -> ViewerResult<GpuMesh> {
        if let Some(gpu) = self.meshes.get(&(model, index)) {
            return Ok(*gpu);
        }

        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} vertices", mesh.name)),
                size: mesh.vertex_bytes().len() as u64,
                usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            },
            mesh.vertex_bytes(),
        )?;
        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} indices", mesh.name)),
                size: mesh.index_bytes().len() as u64,
                usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            },
            mesh.index_bytes(),
        )?;

        let gpu = GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        };
        self.meshes.insert((model, index), gpu);
        Ok(gpu)
    }

    /// Bind groups for a material, re-uploaded when its revision changes
    pub fn material<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        material: &Material,
        layouts: &[BindGroupLayoutHandle],
        material_groups: &[u32],
    ) -> ViewerResult<&GpuMaterial> {
        let up_to_date = self
            .materials
            .get(&material.id())
            .is_some_and(|gpu| gpu.revision == material.revision());

        if !up_to_date {
            let gpu = self.build_material(backend, material, layouts, material_groups)?;
            self.materials.insert(material.id(), gpu);
        }

        self.materials.get(&material.id()).ok_or(ViewerError::InvalidState {
            operation: "bind material",
            state: "material upload failed",
        })
    }

    /// Rewrite the material's uniform buffers. Bind groups are only
    /// recreated when a bound resource changed, e.g. a texture swap.
    fn build_material<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        material: &Material,
        layouts: &[BindGroupLayoutHandle],
        material_groups: &[u32],
    ) -> ViewerResult<GpuMaterial> {
        let program = material.program();
        let (mut buffers, previous) = match self.materials.remove(&material.id()) {
            Some(previous) => {
                let groups = previous.bind_groups.into_iter().zip(previous.entries).collect();
                (previous.buffers, groups)
            }
            None => (Vec::new(), Vec::<((u32, BindGroupHandle), Vec<(u32, BindGroupEntry)>)>::new()),
        };

        let mut all_entries = Vec::with_capacity(material_groups.len());
        let mut bind_groups = Vec::with_capacity(material_groups.len());
        let mut recreated = 0;
        for &group in material_groups {
            let mut entries = Vec::new();
            for (binding, resource) in group_resources(program, group) {
                let entry = match resource {
                    GroupResource::Block(index) => {
                        let layout = &program.blocks()[index];
                        let mut data = UniformBlockData::new(Arc::clone(layout));
                        for member in &layout.members {
                            if let Some(value) = material.uniform_value(&member.name) {
                                data.set(&member.name, value)?;
                            }
                        }

                        let buffer = match buffers.iter().find(|(i, _)| *i == index) {
                            Some((_, buffer)) => *buffer,
                            None => {
                                let buffer = uniform_buffer(backend, &layout.name, layout.size)?;
                                buffers.push((index, buffer));
                                buffer
                            }
                        };
                        backend.write_buffer(buffer, 0, data.bytes());
                        BindGroupEntry::Buffer {
                            buffer,
                            offset: 0,
                            size: None,
                        }
                    }
                    GroupResource::Texture(index) => {
                        let binding_info = &program.textures()[index];
                        let view = match material.uniform_value(&binding_info.name) {
                            Some(UniformValue::Texture(Some(texture))) => self.texture(backend, texture)?,
                            _ => self.fallback(backend, binding_info.dimension)?,
                        };
                        BindGroupEntry::Texture(view)
                    }
                    GroupResource::Sampler => BindGroupEntry::Sampler(self.sampler(backend)?),
                };
                entries.push((binding, entry));
            }

            let reusable = previous
                .iter()
                .find(|((g, _), _)| *g == group)
                .filter(|(_, old_entries)| *old_entries == entries)
                .map(|((_, handle), _)| *handle);
            let handle = match reusable {
                Some(handle) => handle,
                None => {
                    let layout = layouts.get(group as usize).copied().ok_or_else(|| {
                        ViewerError::ShaderValidation {
                            message: format!("No bind group layout for group {}", group),
                        }
                    })?;
                    recreated += 1;
                    backend.create_bind_group(layout, &entries)?
                }
            };
            bind_groups.push((group, handle));
            all_entries.push(entries);
        }

        for ((_, handle), _) in previous {
            if !bind_groups.iter().any(|(_, kept)| *kept == handle) {
                backend.destroy_bind_group(handle);
            }
        }

        log::debug!(
            "Uploaded material {} (revision {}, {} bind groups rebuilt)",
            material.name().unwrap_or("<unnamed>"),
            material.revision(),
            recreated
        );
        Ok(GpuMaterial {
            revision: material.revision(),
            buffers,
            entries: all_entries,
            bind_groups,
        })
    }

    /// Depth target matching the frame size, recreated on resize
    pub fn depth_view<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> ViewerResult<TextureViewHandle> {
        if let Some(depth) = &self.depth {
            if depth.width == width && depth.height == height {
                return Ok(depth.view);
            }
        }
        if let Some(old) = self.depth.take() {
            backend.destroy_texture(old.texture);
        }

        let texture = backend.create_texture(&TextureDescriptor {
            label: Some("depth".into()),
            width: width.max(1),
            height: height.max(1),
            format: DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT,
            ..Default::default()
        })?;
        let view = backend.create_texture_view(texture, TextureDimension::D2)?;
        log::debug!("Created depth target {}x{}", width, height);
        self.depth = Some(DepthTarget {
            texture,
            view,
            width,
            height,
        });
        Ok(view)
    }
}
