//! The seam between the viewer's renderer and the GPU
//!
//! [`GraphicsBackend`] hands out opaque handles for everything it creates.
//! Draw state is recorded between `begin_render_pass` and `end_render_pass`;
//! the viewer opens one pass for the clear, one for the model and one for the
//! skybox per frame. Attachments are always stored at the end of a pass.

use crate::backend::types::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    /// The frame is skipped; the next one may succeed
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    /// The surface must be reconfigured before the next frame
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! handles {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub(crate) u64);
        )*
    };
}

handles! {
    /// Vertex, index or uniform storage
    BufferHandle,
    /// 2D image, cubemap or depth target
    TextureHandle,
    TextureViewHandle,
    SamplerHandle,
    RenderPipelineHandle,
    /// Resources bound together at one group index of a shader program
    BindGroupHandle,
    BindGroupLayoutHandle,
}

/// What one binding slot of a bind group points at
#[derive(Debug, Clone, PartialEq)]
pub enum BindGroupEntry {
    /// A uniform block; `size: None` binds the rest of the buffer
    Buffer {
        buffer: BufferHandle,
        offset: u64,
        size: Option<u64>,
    },
    Texture(TextureViewHandle),
    Sampler(SamplerHandle),
}

/// One binding slot as a shader program reflects it
#[derive(Debug, Clone, PartialEq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStageFlags,
    pub ty: BindingType,
}

/// Stages that read a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageFlags(u32);

impl ShaderStageFlags {
    pub const VERTEX: Self = Self(1 << 0);
    pub const FRAGMENT: Self = Self(1 << 1);
    pub const VERTEX_FRAGMENT: Self = Self((1 << 0) | (1 << 1));

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOrAssign for ShaderStageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Uniform blocks, filterable float textures and filtering samplers are the
/// only resources the bundled shaders declare
#[derive(Debug, Clone, PartialEq)]
pub enum BindingType {
    UniformBuffer,
    Texture { view_dimension: TextureDimension },
    Sampler,
}

/// A complete pipeline for one WGSL program.
///
/// Both sources are whole modules; the entry points are `vs_main` and `fs_main`.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub vertex_shader: String,
    pub fragment_shader: Option<String>,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    /// One layout per bind group index, in index order
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub cull_mode: CullMode,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_targets: Vec<ColorTargetState>,
}

#[derive(Debug, Clone)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

#[derive(Debug, Clone)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub write_mask: ColorWrites,
}

/// Channel mask, laid out as wgpu's `ColorWrites` bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorWrites(pub u32);

impl ColorWrites {
    pub const ALL: Self = Self(0xF);
}

#[derive(Debug, Clone)]
pub struct ColorAttachment {
    pub view: TextureViewHandle,
    pub load_op: LoadOp,
}

/// Whether a pass starts from cleared contents or from what earlier passes drew
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub depth_clear_value: f32,
}

#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// The frame being drawn: swapchain target and its size in pixels
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub swapchain_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

/// GPU access for the renderer, the render passes and the UI overlay.
///
/// Implemented by the wgpu backend for the window and by `DummyBackend`,
/// which records passes for tests.
pub trait GraphicsBackend {
    fn resize(&mut self, width: u32, height: u32);

    /// Size the surface was actually configured with, after device limits
    fn surface_size(&self) -> (u32, u32);

    fn begin_frame(&mut self) -> BackendResult<FrameContext>;

    /// Submit recorded passes and present
    fn end_frame(&mut self) -> BackendResult<()>;

    fn swapchain_format(&self) -> TextureFormat;

    // Resources

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    /// Queue a write; it lands before the next submitted pass
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// View over all mips and layers of a texture
    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        dimension: TextureDimension,
    ) -> BackendResult<TextureViewHandle>;

    /// Write tightly packed texels into one mip level of one layer
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], region: &TextureWrite);

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    // Pipelines and bindings

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle>;

    /// Entries are `(binding, resource)` pairs matching `layout`
    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    // Pass recording

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    fn end_render_pass(&mut self);

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle);

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    /// Indices are always `u32`
    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64);

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32);

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>);

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    );

    // Cleanup

    /// Release a bind group that will not be bound again
    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle);

    fn destroy_texture(&mut self, texture: TextureHandle);
}
