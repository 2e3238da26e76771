//! Skybox pass: a fullscreen triangle sampling a cubemap behind the scene

use std::sync::Arc;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{ViewerError, ViewerResult};
use crate::resources::Texture;
use crate::shader::{Shader, ShaderProgram, ShaderStage, UniformBlockData};

use super::gpu::{self, GroupResource};
use super::pass::{PassContext, RenderPass};

const SKYBOX_SHADER: &str = r#"
struct Skybox {
    InvViewProjMatrix: mat4x4<f32>,
    CameraPosition: vec3<f32>,
}
@group(0) @binding(0) var<uniform> skybox: Skybox;
@group(0) @binding(1) var SkyboxTexture: texture_cube<f32>;
@group(0) @binding(2) var SkyboxSampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    let ndc = uv * 2.0 - 1.0;
    var out: VertexOutput;
    // Far plane, so anything drawn before wins the depth test
    out.position = vec4<f32>(ndc, 1.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let world = skybox.InvViewProjMatrix * vec4<f32>(in.ndc, 1.0, 1.0);
    let direction = normalize(world.xyz / world.w - skybox.CameraPosition);
    let color = textureSampleLevel(SkyboxTexture, SkyboxSampler, direction, 0.0).rgb;
    return vec4<f32>(color, 1.0);
}
"#;

struct SkyboxGpu {
    pipeline: RenderPipelineHandle,
    buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

/// Draws the environment cubemap wherever no geometry was written
pub struct SkyboxRenderPass {
    cubemap: Arc<Texture>,
    program: ShaderProgram,
    uniforms: UniformBlockData,
    gpu: Option<SkyboxGpu>,
}

impl SkyboxRenderPass {
    pub fn new(cubemap: Arc<Texture>) -> ViewerResult<Self> {
        if cubemap.dimension() != TextureDimension::Cube {
            return Err(ViewerError::InvalidState {
                operation: "create skybox pass",
                state: "the texture is not a cubemap",
            });
        }

        let vertex = Shader::from_source(ShaderStage::Vertex, "skybox", SKYBOX_SHADER.to_string())?;
        let fragment = Shader::from_source(ShaderStage::Fragment, "skybox", SKYBOX_SHADER.to_string())?;
        let program = ShaderProgram::build(vertex, fragment)?;
        let block = program.blocks().first().cloned().ok_or_else(|| ViewerError::ShaderValidation {
            message: "Skybox shader has no uniform block".into(),
        })?;

        Ok(Self {
            cubemap,
            program,
            uniforms: UniformBlockData::new(block),
            gpu: None,
        })
    }

    pub fn cubemap(&self) -> &Arc<Texture> {
        &self.cubemap
    }

    fn create_gpu<B: GraphicsBackend>(&self, ctx: &mut PassContext<'_, B>) -> ViewerResult<SkyboxGpu> {
        let layouts = gpu::create_bind_group_layouts(ctx.backend, &self.program)?;
        let layout = layouts.first().copied().ok_or_else(|| ViewerError::ShaderValidation {
            message: "Skybox shader has no bind group".into(),
        })?;

        let pipeline = ctx.backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("skybox".into()),
            vertex_shader: self.program.vertex_source().to_string(),
            fragment_shader: Some(self.program.fragment_source().to_string()),
            vertex_layouts: Vec::new(),
            bind_group_layouts: layouts,
            cull_mode: CullMode::None,
            depth_stencil: Some(DepthStencilState {
                format: gpu::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::LessEqual,
            }),
            color_targets: vec![ColorTargetState {
                format: ctx.backend.swapchain_format(),
                write_mask: ColorWrites::ALL,
            }],
        })?;

        let buffer = gpu::uniform_buffer(ctx.backend, "skybox", self.uniforms.layout().size)?;
        let cube_view = ctx.state.gpu.texture(ctx.backend, &self.cubemap)?;
        let sampler = ctx.sampler()?;

        let entries: Vec<(u32, BindGroupEntry)> = gpu::group_resources(&self.program, 0)
            .into_iter()
            .map(|(binding, resource)| {
                let entry = match resource {
                    GroupResource::Block(_) => BindGroupEntry::Buffer {
                        buffer,
                        offset: 0,
                        size: None,
                    },
                    GroupResource::Texture(_) => BindGroupEntry::Texture(cube_view),
                    GroupResource::Sampler => BindGroupEntry::Sampler(sampler),
                };
                (binding, entry)
            })
            .collect();
        let bind_group = ctx.backend.create_bind_group(layout, &entries)?;

        log::info!("Skybox pass ready ({})", self.cubemap.name());
        Ok(SkyboxGpu {
            pipeline,
            buffer,
            bind_group,
        })
    }
}

impl<B: GraphicsBackend> RenderPass<B> for SkyboxRenderPass {
    fn name(&self) -> &str {
        "Skybox"
    }

    fn render(&mut self, ctx: &mut PassContext<'_, B>) -> ViewerResult<()> {
        let Some(camera) = ctx.camera().cloned() else {
            return Ok(());
        };

        if self.gpu.is_none() {
            self.gpu = Some(self.create_gpu(ctx)?);
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return Ok(());
        };

        self.uniforms
            .set("InvViewProjMatrix", &camera.view_projection_matrix().inverse().into())?;
        self.uniforms
            .set("CameraPosition", &camera.extract_translation().into())?;
        ctx.backend.write_buffer(gpu.buffer, 0, self.uniforms.bytes());

        let depth_view = ctx.depth_view()?;
        ctx.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Skybox".into()),
            color_attachments: vec![ColorAttachment {
                view: ctx.frame.swapchain_view,
                load_op: LoadOp::Load,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth_view,
                depth_load_op: LoadOp::Load,
                depth_clear_value: 1.0,
            }),
        });
        ctx.backend.set_viewport(
            0.0,
            0.0,
            ctx.frame.width as f32,
            ctx.frame.height as f32,
            0.0,
            1.0,
        );
        ctx.backend.set_render_pipeline(gpu.pipeline);
        ctx.backend.set_bind_group(0, gpu.bind_group);
        ctx.backend.draw(0..3, 0..1);
        ctx.backend.end_render_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::renderer::Renderer;
    use crate::scene::Camera;

    #[test]
    fn rejects_2d_textures() {
        let err = SkyboxRenderPass::new(Arc::new(Texture::white())).err().unwrap();
        assert!(matches!(err, ViewerError::InvalidState { .. }));
    }

    #[test]
    fn draws_a_fullscreen_triangle() {
        let mut backend = DummyBackend::default();
        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        let pass = SkyboxRenderPass::new(Arc::new(Texture::black_cube())).unwrap();
        renderer.add_render_pass(Box::new(pass));

        let frame = backend.begin_frame().unwrap();
        renderer.set_camera(&Camera::new());
        renderer.render(&mut backend, frame).unwrap();

        let pass = &backend.passes()[0];
        assert_eq!(pass.label.as_deref(), Some("Skybox"));
        assert_eq!(pass.draws.len(), 1);
        assert_eq!(pass.draws[0].element_count, 3);
        assert!(!pass.draws[0].indexed);
    }

    #[test]
    fn skips_frames_without_camera() {
        let mut backend = DummyBackend::default();
        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        renderer.add_render_pass(Box::new(SkyboxRenderPass::new(Arc::new(Texture::black_cube())).unwrap()));
        let frame = backend.begin_frame().unwrap();
        renderer.render(&mut backend, frame).unwrap();
        assert!(backend.passes().is_empty());
    }
}
