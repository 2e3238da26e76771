//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It keeps the CPU side of
//! every buffer and records passes and draw calls so that tests can observe
//! what the renderer submitted.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;

/// A render pass as it was recorded.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub label: Option<String>,
    pub color_load_ops: Vec<LoadOp>,
    pub depth_load_op: Option<LoadOp>,
    pub draws: Vec<RecordedDraw>,
}

/// A draw call with the state bound when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub pipeline: Option<RenderPipelineHandle>,
    pub bind_groups: Vec<(u32, BindGroupHandle)>,
    pub element_count: u32,
    pub indexed: bool,
}

#[derive(Debug, Default)]
struct BoundState {
    pipeline: Option<RenderPipelineHandle>,
    bind_groups: HashMap<u32, BindGroupHandle>,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    width: u32,
    height: u32,
    buffers: HashMap<u64, Vec<u8>>,
    textures: HashMap<u64, TextureDescriptor>,
    live_bind_groups: usize,
    texture_writes: usize,
    next_id: u64,
    swapchain_view: Option<TextureViewHandle>,
    bound: BoundState,
    current_pass: Option<RecordedPass>,
    passes: Vec<RecordedPass>,
    frames_presented: u64,
}

impl DummyBackend {
    /// Create a new dummy backend with the given surface size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            live_bind_groups: 0,
            texture_writes: 0,
            next_id: 1,
            swapchain_view: None,
            bound: BoundState::default(),
            current_pass: None,
            passes: Vec::new(),
            frames_presented: 0,
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// CPU copy of a buffer's contents.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Bind groups created and not yet destroyed.
    pub fn live_bind_group_count(&self) -> usize {
        self.live_bind_groups
    }

    /// Descriptor of a live texture.
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&texture.0)
    }

    /// Number of texture uploads performed so far.
    pub fn texture_write_count(&self) -> usize {
        self.texture_writes
    }

    /// Passes recorded since the last [`DummyBackend::take_passes`].
    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    /// Drain the recorded passes.
    pub fn take_passes(&mut self) -> Vec<RecordedPass> {
        std::mem::take(&mut self.passes)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn record_draw(&mut self, element_count: u32, indexed: bool) {
        let mut bind_groups: Vec<(u32, BindGroupHandle)> = self
            .bound
            .bind_groups
            .iter()
            .map(|(index, group)| (*index, *group))
            .collect();
        bind_groups.sort_by_key(|(index, _)| *index);

        if let Some(pass) = self.current_pass.as_mut() {
            pass.draws.push(RecordedDraw {
                pipeline: self.bound.pipeline,
                bind_groups,
                element_count,
                indexed,
            });
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(1024, 1024)
    }
}

impl GraphicsBackend for DummyBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let view = TextureViewHandle(self.next_id());
        self.swapchain_view = Some(view);
        Ok(FrameContext {
            swapchain_view: view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.swapchain_view = None;
        self.frames_presented += 1;
        log::trace!("DummyBackend: presented frame {}", self.frames_presented);
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        let id = self.next_id();
        self.buffers.insert(id, vec![0; desc.size as usize]);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer {:?} with {} bytes",
            desc.label,
            data.len()
        );
        let id = self.next_id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        log::trace!(
            "DummyBackend: write_buffer offset={} len={}",
            offset,
            data.len()
        );
        if let Some(contents) = self.buffers.get_mut(&buffer.0) {
            let start = offset as usize;
            let end = start + data.len();
            if contents.len() < end {
                contents.resize(end, 0);
            }
            contents[start..end].copy_from_slice(data);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.dimension == TextureDimension::Cube && desc.width != desc.height {
            return Err(BackendError::TextureCreationFailed(format!(
                "Cubemap faces must be square, got {}x{}",
                desc.width, desc.height
            )));
        }
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {} mips)",
            desc.label,
            desc.width,
            desc.height,
            desc.mip_levels
        );
        let id = self.next_id();
        self.textures.insert(id, desc.clone());
        Ok(TextureHandle(id))
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        _dimension: TextureDimension,
    ) -> BackendResult<TextureViewHandle> {
        if !self.textures.contains_key(&texture.0) {
            return Err(BackendError::TextureCreationFailed("Texture not found".into()));
        }
        Ok(TextureViewHandle(self.next_id()))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], region: &TextureWrite) {
        log::trace!(
            "DummyBackend: write_texture {:?} mip={} layer={} len={}",
            texture,
            region.mip_level,
            region.layer,
            data.len()
        );
        self.texture_writes += 1;
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("DummyBackend: creating sampler {:?}", desc.label);
        Ok(SamplerHandle(self.next_id()))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        log::trace!("DummyBackend: creating bind group layout with {} entries", entries.len());
        Ok(BindGroupLayoutHandle(self.next_id()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        for (_, entry) in entries {
            if let BindGroupEntry::Buffer { buffer, .. } = entry {
                if !self.buffers.contains_key(&buffer.0) {
                    return Err(BackendError::PipelineCreationFailed(
                        "Bind group references a destroyed resource".into(),
                    ));
                }
            }
        }
        self.live_bind_groups += 1;
        Ok(BindGroupHandle(self.next_id()))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        log::trace!("DummyBackend: creating render pipeline {:?}", desc.label);
        Ok(RenderPipelineHandle(self.next_id()))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.bound = BoundState::default();
        self.current_pass = Some(RecordedPass {
            label: desc.label.clone(),
            color_load_ops: desc
                .color_attachments
                .iter()
                .map(|att| att.load_op.clone())
                .collect(),
            depth_load_op: desc
                .depth_stencil_attachment
                .as_ref()
                .map(|att| att.depth_load_op.clone()),
            draws: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        if let Some(pass) = self.current_pass.take() {
            self.passes.push(pass);
        }
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.bound.pipeline = Some(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.bound.bind_groups.insert(index, bind_group);
    }

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferHandle, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferHandle, _offset: u64) {}

    fn set_viewport(&mut self, _x: f32, _y: f32, _width: f32, _height: f32, _min_depth: f32, _max_depth: f32) {}

    fn draw(&mut self, vertices: std::ops::Range<u32>, _instances: std::ops::Range<u32>) {
        self.record_draw(vertices.len() as u32, false);
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        _base_vertex: i32,
        _instances: std::ops::Range<u32>,
    ) {
        self.record_draw(indices.len() as u32, true);
    }

    fn destroy_bind_group(&mut self, _bind_group: BindGroupHandle) {
        self.live_bind_groups = self.live_bind_groups.saturating_sub(1);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_desc(size: u64) -> BufferDescriptor {
        BufferDescriptor {
            label: Some("test".into()),
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }
    }

    #[test]
    fn buffer_writes_are_visible() {
        let mut backend = DummyBackend::default();
        let buffer = backend.create_buffer(&uniform_desc(8)).unwrap();
        backend.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(backend.buffer_contents(buffer), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
    }

    #[test]
    fn draws_are_recorded_inside_passes() {
        let mut backend = DummyBackend::default();
        let frame = backend.begin_frame().unwrap();
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                load_op: LoadOp::Load,
            }],
            depth_stencil_attachment: None,
        });
        backend.draw(0..3, 0..1);
        backend.end_render_pass();
        backend.draw(0..3, 0..1);
        backend.end_frame().unwrap();

        assert_eq!(backend.passes().len(), 1);
        assert_eq!(backend.passes()[0].draws.len(), 1, "draws outside a pass are dropped");
        assert_eq!(backend.passes()[0].draws[0].element_count, 3);
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn cubemap_must_be_square() {
        let mut backend = DummyBackend::default();
        let result = backend.create_texture(&TextureDescriptor {
            width: 4,
            height: 2,
            dimension: TextureDimension::Cube,
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
