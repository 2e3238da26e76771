//! Scene renderer
//!
//! The renderer owns an ordered list of [`RenderPass`]es and a per-frame
//! queue of camera, lights and models, usually filled by
//! [`crate::scene::RendererSceneVisitor`]. Shader programs are registered with
//! two callbacks that write the uniforms the renderer owns (transforms and
//! lights); everything else comes from the drawn mesh's [`Material`].
//!
//! Uniform blocks whose members all belong to the material are uploaded once
//! per material revision. The remaining blocks are snapshotted per draw into
//! slot buffers, since queued buffer writes only land at submission.

mod forward_pass;
mod gpu;
mod pass;
mod skybox_pass;

use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use parking_lot::RwLock;

pub use forward_pass::ForwardRenderPass;
pub use pass::{PassContext, RenderPass};
pub use skybox_pass::SkyboxRenderPass;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{ViewerError, ViewerResult};
use crate::resources::{Material, Model, UniformValue};
use crate::scene::{Camera, PointLight};
use crate::shader::{ProgramId, ShaderProgram, UniformBlockData, UniformLocation};

use gpu::{GpuResources, GroupResource};

/// Writes transform uniforms: `(uniforms, world_matrix, camera, camera_changed)`
pub type UpdateTransformsFn =
    Box<dyn Fn(&mut ProgramUniforms<'_>, Mat4, &Camera, bool) -> ViewerResult<()>>;

/// Writes light uniforms for the frame's light, if any
pub type UpdateLightsFn = Box<dyn Fn(&mut ProgramUniforms<'_>, Option<&PointLight>) -> ViewerResult<()>>;

/// Renderer-owned uniform values of one program
pub struct ProgramUniforms<'a> {
    program: &'a ShaderProgram,
    blocks: &'a mut [UniformBlockData],
}

impl<'a> ProgramUniforms<'a> {
    pub fn program(&self) -> &ShaderProgram {
        self.program
    }

    /// Whether the program declares a block member with this name
    pub fn has(&self, name: &str) -> bool {
        matches!(
            self.program.uniform(name).map(|info| info.location),
            Some(UniformLocation::Member { .. })
        )
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> ViewerResult<()> {
        let value = value.into();
        let info = self
            .program
            .uniform(name)
            .ok_or_else(|| ViewerError::UnknownUniform(name.to_string()))?;
        match info.location {
            UniformLocation::Member { block, .. } => self
                .blocks
                .get_mut(block)
                .ok_or_else(|| ViewerError::UnknownUniform(name.to_string()))?
                .set(name, &value),
            UniformLocation::Texture { .. } => Err(ViewerError::UniformTypeMismatch {
                name: name.to_string(),
                expected: info.ty.name(),
                found: value.type_name(),
            }),
        }
    }

    /// Like [`ProgramUniforms::set`], skipping names the program lacks
    pub fn set_if_present(&mut self, name: &str, value: impl Into<UniformValue>) -> ViewerResult<()> {
        if self.has(name) {
            self.set(name, value)
        } else {
            Ok(())
        }
    }
}

/// Light callback matching the `Light*` uniforms of the bundled shaders.
///
/// Only one point light is supported, so indirect lighting is always on.
pub fn default_update_lights_function() -> UpdateLightsFn {
    Box::new(|uniforms, light| {
        let (color, position, attenuation) = match light {
            Some(light) => (light.radiance(), light.position, light.attenuation),
            None => (glam::Vec3::ZERO, glam::Vec3::ZERO, glam::Vec2::new(0.0, 1.0)),
        };
        uniforms.set_if_present("LightIndirect", 1.0f32)?;
        uniforms.set_if_present("LightColor", color)?;
        uniforms.set_if_present("LightPosition", position)?;
        uniforms.set_if_present("LightDirection", glam::Vec3::ZERO)?;
        uniforms.set_if_present("LightAttenuation", attenuation)?;
        Ok(())
    })
}

/// Per-draw copy of the renderer-owned blocks
struct ProgramSlot {
    buffers: Vec<(usize, BufferHandle)>,
    bind_groups: Vec<(u32, BindGroupHandle)>,
}

struct ProgramState {
    program: Arc<ShaderProgram>,
    update_transforms: UpdateTransformsFn,
    update_lights: UpdateLightsFn,
    blocks: Vec<UniformBlockData>,
    last_camera: Option<Camera>,
    layouts: Vec<BindGroupLayoutHandle>,
    /// Groups filled from materials; the rest come from slots
    material_groups: Vec<u32>,
    program_groups: Vec<u32>,
    prepared: bool,
    pipelines: HashMap<Vec<(VertexSemantic, u32)>, RenderPipelineHandle>,
    slots: Vec<ProgramSlot>,
    next_slot: usize,
}

impl ProgramState {
    /// Create layouts and split groups by ownership, using the first material drawn
    fn prepare<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, material: &Material) -> ViewerResult<()> {
        if self.prepared {
            return Ok(());
        }
        self.layouts = gpu::create_bind_group_layouts(backend, &self.program)?;
        let program = Arc::clone(&self.program);
        for group in program.groups() {
            let mut owners = gpu::group_resources(&program, group)
                .into_iter()
                .filter_map(|(_, resource)| match resource {
                    GroupResource::Block(index) => {
                        let block = &program.blocks()[index];
                        let owned = block.members.iter().filter(|m| material.has_uniform(&m.name)).count();
                        Some(if owned == block.members.len() {
                            Ok(true)
                        } else if owned == 0 {
                            Ok(false)
                        } else {
                            Err(block.name.clone())
                        })
                    }
                    GroupResource::Texture(_) => Some(Ok(true)),
                    GroupResource::Sampler => None,
                })
                .collect::<Result<Vec<bool>, String>>()
                .map_err(|block| ViewerError::ShaderValidation {
                    message: format!("Uniform block {} mixes material and renderer uniforms", block),
                })?;
            owners.dedup();

            match owners.as_slice() {
                [] | [false] => self.program_groups.push(group),
                [true] => self.material_groups.push(group),
                _ => {
                    return Err(ViewerError::ShaderValidation {
                        message: format!(
                            "Bind group {} of {} mixes material and renderer resources",
                            group,
                            program.label()
                        ),
                    })
                }
            }
        }
        self.prepared = true;
        Ok(())
    }

    fn pipeline<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        model: &Model,
    ) -> ViewerResult<RenderPipelineHandle> {
        if let Some(pipeline) = self.pipelines.get(model.attributes()) {
            return Ok(*pipeline);
        }
        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(self.program.label().to_string()),
            vertex_shader: self.program.vertex_source().to_string(),
            fragment_shader: Some(self.program.fragment_source().to_string()),
            vertex_layouts: vec![model.vertex_layout()],
            bind_group_layouts: self.layouts.clone(),
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState {
                format: gpu::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            color_targets: vec![ColorTargetState {
                format: backend.swapchain_format(),
                write_mask: ColorWrites::ALL,
            }],
        })?;
        log::info!("Created pipeline for {}", self.program.label());
        self.pipelines.insert(model.attributes().to_vec(), pipeline);
        Ok(pipeline)
    }

    /// Copy the renderer-owned blocks into the next free slot
    fn snapshot<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        gpu: &mut GpuResources,
    ) -> ViewerResult<Vec<(u32, BindGroupHandle)>> {
        if self.next_slot == self.slots.len() {
            let slot = self.create_slot(backend, gpu)?;
            self.slots.push(slot);
        }
        let slot = &self.slots[self.next_slot];
        self.next_slot += 1;

        for (index, buffer) in &slot.buffers {
            backend.write_buffer(*buffer, 0, self.blocks[*index].bytes());
        }
        Ok(slot.bind_groups.clone())
    }

    fn create_slot<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        gpu: &mut GpuResources,
    ) -> ViewerResult<ProgramSlot> {
        let mut buffers = Vec::new();
        let mut bind_groups = Vec::new();

        for &group in &self.program_groups {
            let mut entries = Vec::new();
            for (binding, resource) in gpu::group_resources(&self.program, group) {
                let entry = match resource {
                    GroupResource::Block(index) => {
                        let block = &self.program.blocks()[index];
                        let buffer = gpu::uniform_buffer(backend, &block.name, block.size)?;
                        buffers.push((index, buffer));
                        BindGroupEntry::Buffer {
                            buffer,
                            offset: 0,
                            size: None,
                        }
                    }
                    GroupResource::Sampler => BindGroupEntry::Sampler(gpu.sampler(backend)?),
                    GroupResource::Texture(_) => {
                        return Err(ViewerError::InvalidState {
                            operation: "create renderer bind group",
                            state: "group holds a material texture",
                        })
                    }
                };
                entries.push((binding, entry));
            }
            bind_groups.push((group, backend.create_bind_group(self.layouts[group as usize], &entries)?));
        }

        log::trace!("Allocated uniform slot {} for {}", self.slots.len(), self.program.label());
        Ok(ProgramSlot { buffers, bind_groups })
    }
}

/// A model queued for this frame with its world matrix
struct QueuedModel {
    model: Arc<RwLock<Model>>,
    world: Mat4,
}

#[derive(Default)]
pub(crate) struct FrameQueue {
    pub camera: Option<Camera>,
    lights: Vec<PointLight>,
    models: Vec<QueuedModel>,
}

/// Everything except the passes, so passes can borrow it mutably
#[derive(Default)]
pub(crate) struct RendererState {
    programs: HashMap<ProgramId, ProgramState>,
    pub queue: FrameQueue,
    pub gpu: GpuResources,
    extra_lights_warned: bool,
}

impl RendererState {
    /// Draw every queued model with its materials' programs
    pub fn draw_models<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> ViewerResult<u32> {
        let Some(camera) = self.queue.camera.clone() else {
            return Ok(0);
        };
        let light = self.queue.lights.first().cloned();
        let models: Vec<(Arc<RwLock<Model>>, Mat4)> = self
            .queue
            .models
            .iter()
            .map(|q| (Arc::clone(&q.model), q.world))
            .collect();

        let mut draws = 0;
        for (model, world) in models {
            let model = model.read();
            for (index, mesh) in model.meshes().iter().enumerate() {
                let Some(material) = model.mesh_material(mesh) else {
                    log::trace!("Mesh {} has no material, skipped", mesh.name);
                    continue;
                };
                if mesh.index_count() == 0 {
                    continue;
                }

                let program_id = material.program().id();
                let state = self.programs.get_mut(&program_id).ok_or(ViewerError::InvalidState {
                    operation: "draw mesh",
                    state: "its shader program is not registered",
                })?;
                state.prepare(backend, material)?;
                let pipeline = state.pipeline(backend, &model)?;

                let camera_changed = state.last_camera.as_ref() != Some(&camera);
                {
                    let mut uniforms = ProgramUniforms {
                        program: &state.program,
                        blocks: &mut state.blocks,
                    };
                    (state.update_transforms)(&mut uniforms, world, &camera, camera_changed)?;
                    (state.update_lights)(&mut uniforms, light.as_ref())?;
                }
                state.last_camera = Some(camera.clone());

                let mut bind_groups = state.snapshot(backend, &mut self.gpu)?;
                let layouts = state.layouts.clone();
                let material_groups = state.material_groups.clone();
                let gpu_material = self.gpu.material(backend, material, &layouts, &material_groups)?;
                bind_groups.extend(gpu_material.bind_groups.iter().copied());
                bind_groups.sort_by_key(|(group, _)| *group);

                let gpu_mesh = self.gpu.mesh(backend, model.id(), index, mesh)?;

                backend.set_render_pipeline(pipeline);
                for (group, bind_group) in bind_groups {
                    backend.set_bind_group(group, bind_group);
                }
                backend.set_vertex_buffer(0, gpu_mesh.vertex_buffer, 0);
                backend.set_index_buffer(gpu_mesh.index_buffer, 0);
                backend.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
                draws += 1;
            }
        }
        Ok(draws)
    }
}

/// Drives the registered passes over the queued scene
pub struct Renderer<B: GraphicsBackend> {
    passes: Vec<Box<dyn RenderPass<B>>>,
    state: RendererState,
}

impl<B: GraphicsBackend> Default for Renderer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            state: RendererState::default(),
        }
    }

    /// Make a program drawable; `update_transforms` and `update_lights` fill its
    /// renderer-owned uniforms before each draw
    pub fn register_shader_program(
        &mut self,
        program: Arc<ShaderProgram>,
        update_transforms: UpdateTransformsFn,
        update_lights: UpdateLightsFn,
    ) {
        let blocks = program
            .blocks()
            .iter()
            .map(|block| UniformBlockData::new(Arc::clone(block)))
            .collect();

        log::info!("Registered shader program {}", program.label());
        self.state.programs.insert(
            program.id(),
            ProgramState {
                program,
                update_transforms,
                update_lights,
                blocks,
                last_camera: None,
                layouts: Vec::new(),
                material_groups: Vec::new(),
                program_groups: Vec::new(),
                prepared: false,
                pipelines: HashMap::new(),
                slots: Vec::new(),
                next_slot: 0,
            },
        );
    }

    pub fn default_update_lights_function(&self) -> UpdateLightsFn {
        default_update_lights_function()
    }

    pub fn add_render_pass(&mut self, pass: Box<dyn RenderPass<B>>) {
        log::debug!("Render pass added: {}", pass.name());
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn set_camera(&mut self, camera: &Camera) {
        self.state.queue.camera = Some(camera.clone());
    }

    /// Queue a light; only the first one of a frame is used
    pub fn add_light(&mut self, light: &PointLight) {
        if !self.state.queue.lights.is_empty() && !self.state.extra_lights_warned {
            log::warn!("Only one point light is supported, extra lights are ignored");
            self.state.extra_lights_warned = true;
        }
        self.state.queue.lights.push(light.clone());
    }

    pub fn add_model(&mut self, model: Arc<RwLock<Model>>, world: Mat4) {
        self.state.queue.models.push(QueuedModel { model, world });
    }

    pub fn queued_model_count(&self) -> usize {
        self.state.queue.models.len()
    }

    pub fn queued_camera(&self) -> Option<&Camera> {
        self.state.queue.camera.as_ref()
    }

    /// Clear the frame's color target and the renderer's depth target
    pub fn clear(&mut self, backend: &mut B, frame: FrameContext, color: [f32; 4], depth: f32) -> ViewerResult<()> {
        let depth_view = self.state.gpu.depth_view(backend, frame.width, frame.height)?;
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Clear".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                load_op: LoadOp::Clear(color),
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth_view,
                depth_load_op: LoadOp::Clear([depth; 4]),
                depth_clear_value: depth,
            }),
        });
        backend.end_render_pass();
        Ok(())
    }

    /// Run every pass in order, then drop the frame's queue
    pub fn render(&mut self, backend: &mut B, frame: FrameContext) -> ViewerResult<()> {
        for state in self.state.programs.values_mut() {
            state.next_slot = 0;
        }

        let mut ctx = PassContext {
            backend,
            frame,
            state: &mut self.state,
        };
        let result = self
            .passes
            .iter_mut()
            .try_for_each(|pass| pass.render(&mut ctx));

        self.state.queue = FrameQueue::default();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::resources::Mesh;
    use crate::shader::{Shader, ShaderStage};
    use glam::Vec3;

    const SHADER: &str = r#"
struct Camera {
    ViewProjMatrix: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> camera: Camera;

struct Surface {
    Color: vec3<f32>,
}
@group(1) @binding(0) var<uniform> surface: Surface;

struct Object {
    WorldMatrix: mat4x4<f32>,
}
@group(2) @binding(0) var<uniform> object: Object;

@vertex
fn vs_main(@location(0) VertexPosition: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.ViewProjMatrix * object.WorldMatrix * vec4<f32>(VertexPosition, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(surface.Color, 1.0);
}
"#;

    fn program() -> Arc<ShaderProgram> {
        let vertex = Shader::from_source(ShaderStage::Vertex, "test", SHADER.into()).unwrap();
        let fragment = Shader::from_source(ShaderStage::Fragment, "test", SHADER.into()).unwrap();
        Arc::new(ShaderProgram::build(vertex, fragment).unwrap())
    }

    fn update_transforms() -> UpdateTransformsFn {
        Box::new(|uniforms, world, camera, camera_changed| {
            if camera_changed {
                uniforms.set("ViewProjMatrix", camera.view_projection_matrix())?;
            }
            uniforms.set("WorldMatrix", world)
        })
    }

    fn setup() -> (DummyBackend, Renderer<DummyBackend>, Arc<RwLock<Model>>) {
        let backend = DummyBackend::default();
        let mut renderer = Renderer::new();
        let program = program();
        renderer.register_shader_program(
            Arc::clone(&program),
            update_transforms(),
            default_update_lights_function(),
        );
        renderer.add_render_pass(Box::new(ForwardRenderPass::new()));

        let mut material = Material::new(program, &["ViewProjMatrix", "WorldMatrix"]);
        material.set_uniform_value("Color", Vec3::X).unwrap();
        let model = Model::new(
            vec![Mesh::cube().with_material(0)],
            vec![material],
            vec![(VertexSemantic::Position, 0)],
        );
        (backend, renderer, Arc::new(RwLock::new(model)))
    }

    fn queue(renderer: &mut Renderer<DummyBackend>, model: &Arc<RwLock<Model>>, offsets: &[f32]) {
        renderer.set_camera(&Camera::new());
        for x in offsets {
            renderer.add_model(Arc::clone(model), Mat4::from_translation(Vec3::new(*x, 0.0, 0.0)));
        }
    }

    #[test]
    fn each_draw_gets_its_own_transform_buffer() {
        let (mut backend, mut renderer, model) = setup();
        let frame = backend.begin_frame().unwrap();
        queue(&mut renderer, &model, &[1.0, 2.0]);
        renderer.render(&mut backend, frame).unwrap();

        let passes = backend.passes();
        assert_eq!(passes.len(), 1);
        let draws = &passes[0].draws;
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].element_count, 36);

        let object_groups: Vec<BindGroupHandle> = draws
            .iter()
            .map(|d| d.bind_groups.iter().find(|(g, _)| *g == 2).unwrap().1)
            .collect();
        assert_ne!(object_groups[0], object_groups[1]);

        let material_groups: Vec<BindGroupHandle> = draws
            .iter()
            .map(|d| d.bind_groups.iter().find(|(g, _)| *g == 1).unwrap().1)
            .collect();
        assert_eq!(material_groups[0], material_groups[1]);
    }

    #[test]
    fn queue_is_reset_after_render() {
        let (mut backend, mut renderer, model) = setup();
        let frame = backend.begin_frame().unwrap();
        queue(&mut renderer, &model, &[0.0]);
        renderer.render(&mut backend, frame).unwrap();
        assert_eq!(renderer.queued_model_count(), 0);
        assert!(renderer.queued_camera().is_none());
    }

    #[test]
    fn slots_are_reused_across_frames() {
        let (mut backend, mut renderer, model) = setup();
        for _ in 0..3 {
            let frame = backend.begin_frame().unwrap();
            queue(&mut renderer, &model, &[0.0, 1.0]);
            renderer.render(&mut backend, frame).unwrap();
            backend.end_frame().unwrap();
        }
        let buffers_after_three = backend.buffer_count();

        let frame = backend.begin_frame().unwrap();
        queue(&mut renderer, &model, &[0.0, 1.0]);
        renderer.render(&mut backend, frame).unwrap();
        assert_eq!(backend.buffer_count(), buffers_after_three);
    }

    #[test]
    fn material_changes_reuse_bind_groups() {
        let (mut backend, mut renderer, model) = setup();
        let frame = backend.begin_frame().unwrap();
        queue(&mut renderer, &model, &[0.0]);
        renderer.render(&mut backend, frame).unwrap();
        let live = backend.live_bind_group_count();

        for color in [Vec3::Y, Vec3::Z, Vec3::ONE] {
            model
                .write()
                .material_mut(0)
                .unwrap()
                .set_uniform_value("Color", color)
                .unwrap();
            queue(&mut renderer, &model, &[0.0]);
            renderer.render(&mut backend, frame).unwrap();
        }

        let group = |pass: usize| {
            backend.passes()[pass].draws[0]
                .bind_groups
                .iter()
                .find(|(g, _)| *g == 1)
                .unwrap()
                .1
        };
        assert_eq!(group(0), group(3));
        assert_eq!(backend.live_bind_group_count(), live);
    }

    #[test]
    fn unregistered_programs_are_rejected() {
        let mut backend = DummyBackend::default();
        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        renderer.add_render_pass(Box::new(ForwardRenderPass::new()));
        let material = Material::new(program(), &[]);
        let model = Model::new(vec![Mesh::cube().with_material(0)], vec![material], vec![]);

        let frame = backend.begin_frame().unwrap();
        renderer.set_camera(&Camera::new());
        renderer.add_model(Arc::new(RwLock::new(model)), Mat4::IDENTITY);
        let err = renderer.render(&mut backend, frame).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidState { .. }));
    }

    #[test]
    fn clear_pass_clears_color_and_depth() {
        let (mut backend, mut renderer, _) = setup();
        let frame = backend.begin_frame().unwrap();
        renderer.clear(&mut backend, frame, [0.0, 0.0, 0.0, 1.0], 1.0).unwrap();
        let pass = &backend.passes()[0];
        assert_eq!(pass.label.as_deref(), Some("Clear"));
        assert_eq!(pass.color_load_ops, vec![LoadOp::Clear([0.0, 0.0, 0.0, 1.0])]);
        assert!(matches!(pass.depth_load_op, Some(LoadOp::Clear(_))));
    }
}
