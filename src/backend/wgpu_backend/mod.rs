//! The viewer's window backend on wgpu
//!
//! Pass commands are buffered until `end_render_pass`, then replayed into a
//! `wgpu::RenderPass` so the pass can borrow the resources it references.
//! The swapchain view handle is renewed every frame and resolved lazily.

mod convert;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::backend::traits::*;
use crate::backend::types::*;

#[derive(Clone)]
enum PassCommand {
    Pipeline(RenderPipelineHandle),
    BindGroup(u32, BindGroupHandle),
    VertexBuffer(u32, BufferHandle, u64),
    IndexBuffer(BufferHandle, u64),
    Viewport([f32; 6]),
    Draw(Range<u32>, Range<u32>),
    DrawIndexed(Range<u32>, i32, Range<u32>),
}

struct RecordedPass {
    descriptor: RenderPassDescriptor,
    commands: Vec<PassCommand>,
}

/// Live wgpu objects behind one handle type
struct Registry<T> {
    items: HashMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Registry<T> {
    fn reserve(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, item: T) -> u64 {
        let id = self.reserve();
        self.items.insert(id, item);
        id
    }

    fn get(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }

    fn remove(&mut self, id: u64) {
        self.items.remove(&id);
    }
}

/// Clamp to device limits while maintaining aspect ratio
fn clamp_surface_size(max_size: u32, width: u32, height: u32) -> (u32, u32) {
    if width > max_size || height > max_size {
        let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
        (
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
        )
    } else {
        (width.max(1), height.max(1))
    }
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    frame: Option<wgpu::SurfaceTexture>,
    frame_view: TextureViewHandle,
    encoder: Option<wgpu::CommandEncoder>,
    recording: Option<RecordedPass>,

    buffers: Registry<wgpu::Buffer>,
    textures: Registry<wgpu::Texture>,
    views: Registry<wgpu::TextureView>,
    samplers: Registry<wgpu::Sampler>,
    layouts: Registry<wgpu::BindGroupLayout>,
    bind_groups: Registry<wgpu::BindGroup>,
    pipelines: Registry<wgpu::RenderPipeline>,
}

impl WgpuBackend {
    /// Create the backend for a window, blocking on adapter and device requests
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        // WGPU_BACKEND narrows the choice, otherwise let wgpu pick the primary backend
        let backends = wgpu::util::backend_bits_from_env().unwrap_or(wgpu::Backends::PRIMARY);
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;
        let info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scene Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        // Prefer sRGB so the shaders can write linear color
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                BackendError::SurfaceCreationFailed("Surface reports no supported formats".into())
            })?;

        let (width, height) = clamp_surface_size(
            device.limits().max_texture_dimension_2d,
            size.width,
            size.height,
        );
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface configured: {}x{} {:?}", width, height, format);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            frame: None,
            frame_view: TextureViewHandle(0),
            encoder: None,
            recording: None,
            buffers: Registry::default(),
            textures: Registry::default(),
            views: Registry::default(),
            samplers: Registry::default(),
            layouts: Registry::default(),
            bind_groups: Registry::default(),
            pipelines: Registry::default(),
        })
    }

    fn record(&mut self, command: PassCommand) {
        if let Some(pass) = self.recording.as_mut() {
            pass.commands.push(command);
        }
    }

    fn swapchain_view(&self) -> Option<wgpu::TextureView> {
        self.frame
            .as_ref()
            .map(|frame| frame.texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn resolve_view<'a>(
        &'a self,
        handle: TextureViewHandle,
        swapchain: Option<&'a wgpu::TextureView>,
    ) -> Option<&'a wgpu::TextureView> {
        if handle == self.frame_view {
            swapchain
        } else {
            self.views.get(handle.0)
        }
    }

    fn replay<'p>(&'p self, pass: &mut wgpu::RenderPass<'p>, commands: &'p [PassCommand]) {
        for command in commands {
            match command {
                PassCommand::Pipeline(handle) => {
                    if let Some(pipeline) = self.pipelines.get(handle.0) {
                        pass.set_pipeline(pipeline);
                    }
                }
                PassCommand::BindGroup(index, handle) => {
                    if let Some(group) = self.bind_groups.get(handle.0) {
                        pass.set_bind_group(*index, group, &[]);
                    }
                }
                PassCommand::VertexBuffer(slot, handle, offset) => {
                    if let Some(buffer) = self.buffers.get(handle.0) {
                        pass.set_vertex_buffer(*slot, buffer.slice(*offset..));
                    }
                }
                PassCommand::IndexBuffer(handle, offset) => {
                    if let Some(buffer) = self.buffers.get(handle.0) {
                        pass.set_index_buffer(buffer.slice(*offset..), wgpu::IndexFormat::Uint32);
                    }
                }
                PassCommand::Viewport([x, y, w, h, min_depth, max_depth]) => {
                    pass.set_viewport(*x, *y, *w, *h, *min_depth, *max_depth);
                }
                PassCommand::Draw(vertices, instances) => {
                    pass.draw(vertices.clone(), instances.clone());
                }
                PassCommand::DrawIndexed(indices, base_vertex, instances) => {
                    pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                }
            }
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) =
            clamp_surface_size(self.device.limits().max_texture_dimension_2d, width, height);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let frame = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost => BackendError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
            _ => BackendError::AcquireImageFailed(e.to_string()),
        })?;

        self.frame = Some(frame);
        self.frame_view = TextureViewHandle(self.views.reserve());
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                }),
        );

        Ok(FrameContext {
            swapchain_view: self.frame_view,
            width: self.surface_config.width,
            height: self.surface_config.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        convert::texture_format_from_wgpu(self.surface_config.format)
            .unwrap_or(TextureFormat::Bgra8UnormSrgb)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label.as_deref(),
            size: desc.size,
            usage: desc.usage.into(),
            mapped_at_creation: false,
        });
        Ok(BufferHandle(self.buffers.insert(buffer)))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: desc.label.as_deref(),
            contents: data,
            usage: desc.usage.into(),
        });
        Ok(BufferHandle(self.buffers.insert(buffer)))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if let Some(buffer) = self.buffers.get(buffer.0) {
            self.queue.write_buffer(buffer, offset, data);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.dimension == TextureDimension::Cube && desc.width != desc.height {
            return Err(BackendError::TextureCreationFailed(format!(
                "Cubemap faces must be square, got {}x{}",
                desc.width, desc.height
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.dimension.layer_count(),
            },
            mip_level_count: desc.mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.into(),
            usage: desc.usage.into(),
            view_formats: &[],
        });
        log::debug!(
            "Created texture {:?} ({}x{}, {} mips, {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.mip_levels,
            desc.dimension
        );
        Ok(TextureHandle(self.textures.insert(texture)))
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        dimension: TextureDimension,
    ) -> BackendResult<TextureViewHandle> {
        let texture = self
            .textures
            .get(texture.0)
            .ok_or_else(|| BackendError::TextureCreationFailed("Texture not found".into()))?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(dimension.into()),
            ..Default::default()
        });
        Ok(TextureViewHandle(self.views.insert(view)))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], region: &TextureWrite) {
        let Some(texture) = self.textures.get(texture.0) else {
            return;
        };
        let bytes_per_pixel = convert::texture_format_from_wgpu(texture.format())
            .map_or(4, |format| format.bytes_per_pixel());
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: region.mip_level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: region.layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(region.width * bytes_per_pixel),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        let address_mode = desc.address_mode.into();
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: desc.label.as_deref(),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Ok(SamplerHandle(self.samplers.insert(sampler)))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into(),
                ty: (&entry.ty).into(),
                count: None,
            })
            .collect();
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &entries,
            });
        Ok(BindGroupLayoutHandle(self.layouts.insert(layout)))
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let layout = self
            .layouts
            .get(layout.0)
            .ok_or_else(|| BackendError::PipelineCreationFailed("Layout not found".into()))?;

        let resources: Option<Vec<wgpu::BindGroupEntry>> = entries
            .iter()
            .map(|(binding, entry)| {
                let resource = match entry {
                    BindGroupEntry::Buffer { buffer, offset, size } => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: self.buffers.get(buffer.0)?,
                            offset: *offset,
                            size: size.and_then(std::num::NonZeroU64::new),
                        })
                    }
                    BindGroupEntry::Texture(view) => {
                        wgpu::BindingResource::TextureView(self.views.get(view.0)?)
                    }
                    BindGroupEntry::Sampler(sampler) => {
                        wgpu::BindingResource::Sampler(self.samplers.get(sampler.0)?)
                    }
                };
                Some(wgpu::BindGroupEntry {
                    binding: *binding,
                    resource,
                })
            })
            .collect();
        let resources = resources.ok_or_else(|| {
            BackendError::PipelineCreationFailed("Bind group references a destroyed resource".into())
        })?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &resources,
        });
        Ok(BindGroupHandle(self.bind_groups.insert(bind_group)))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        let module = |source: &str| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: desc.label.as_deref(),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        };
        let vertex_module = module(&desc.vertex_shader);
        let fragment_module = desc.fragment_shader.as_deref().map(module);

        let layouts: Option<Vec<&wgpu::BindGroupLayout>> = desc
            .bind_group_layouts
            .iter()
            .map(|handle| self.layouts.get(handle.0))
            .collect();
        let layouts = layouts.ok_or_else(|| {
            BackendError::PipelineCreationFailed("Pipeline references an unknown bind group layout".into())
        })?;
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });

        // Attribute arrays must outlive the wgpu layouts that borrow them
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|a| wgpu::VertexAttribute {
                        format: a.format.into(),
                        offset: a.offset,
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = desc
            .color_targets
            .iter()
            .map(|target| {
                Some(wgpu::ColorTargetState {
                    format: target.format.into(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::from_bits_truncate(target.write_mask.0),
                })
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label.as_deref(),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: "vs_main",
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: fragment_module.as_ref().map(|module| wgpu::FragmentState {
                    module,
                    entry_point: "fs_main",
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: desc.cull_mode.into(),
                    ..Default::default()
                },
                depth_stencil: desc.depth_stencil.as_ref().map(|ds| wgpu::DepthStencilState {
                    format: ds.format.into(),
                    depth_write_enabled: ds.depth_write_enabled,
                    depth_compare: ds.depth_compare.into(),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });
        log::debug!("Created render pipeline {:?}", desc.label);
        Ok(RenderPipelineHandle(self.pipelines.insert(pipeline)))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.recording = Some(RecordedPass {
            descriptor: desc.clone(),
            commands: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        let Some(recorded) = self.recording.take() else {
            return;
        };
        let Some(mut encoder) = self.encoder.take() else {
            return;
        };
        let swapchain = self.swapchain_view();

        {
            let descriptor = &recorded.descriptor;
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = descriptor
                .color_attachments
                .iter()
                .filter_map(|attachment| {
                    let view = self.resolve_view(attachment.view, swapchain.as_ref())?;
                    Some(Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: convert::color_load(&attachment.load_op),
                            store: wgpu::StoreOp::Store,
                        },
                    }))
                })
                .collect();
            let depth_stencil_attachment =
                descriptor.depth_stencil_attachment.as_ref().and_then(|attachment| {
                    let view = self.resolve_view(attachment.view, swapchain.as_ref())?;
                    Some(wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: convert::depth_load(
                                &attachment.depth_load_op,
                                attachment.depth_clear_value,
                            ),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    })
                });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: descriptor.label.as_deref(),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.replay(&mut pass, &recorded.commands);
        }

        self.encoder = Some(encoder);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.record(PassCommand::Pipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.record(PassCommand::BindGroup(index, bind_group));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        self.record(PassCommand::VertexBuffer(slot, buffer, offset));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64) {
        self.record(PassCommand::IndexBuffer(buffer, offset));
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        self.record(PassCommand::Viewport([x, y, width, height, min_depth, max_depth]));
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.record(PassCommand::Draw(vertices, instances));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.record(PassCommand::DrawIndexed(indices, base_vertex, instances));
    }

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        self.bind_groups.remove(bind_group.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(texture.0);
    }
}

/// Access for the egui overlay, which renders with its own wgpu renderer
impl WgpuBackend {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn wgpu_surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Split borrows so egui can upload textures into the frame's encoder
    pub fn device_queue_encoder(
        &mut self,
    ) -> (&wgpu::Device, &wgpu::Queue, Option<&mut wgpu::CommandEncoder>) {
        (&self.device, &self.queue, self.encoder.as_mut())
    }

    /// Paint the UI over `target` after the scene passes, keeping their output
    pub fn render_egui(
        &mut self,
        renderer: &egui_wgpu::Renderer,
        paint_jobs: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        target: TextureViewHandle,
    ) {
        let swapchain = self.swapchain_view();
        let view = if target == self.frame_view {
            swapchain.as_ref()
        } else {
            self.views.get(target.0)
        };
        let (Some(view), Some(encoder)) = (view, self.encoder.as_mut()) else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        renderer.render(&mut pass, paint_jobs, screen_descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_is_clamped_keeping_aspect() {
        assert_eq!(clamp_surface_size(8192, 1024, 1024), (1024, 1024));
        assert_eq!(clamp_surface_size(2048, 4096, 2048), (2048, 1024));
        assert_eq!(clamp_surface_size(2048, 0, 0), (1, 1));
    }

    #[test]
    fn registry_ids_are_never_reused() {
        let mut registry: Registry<&str> = Registry::default();
        let first = registry.insert("a");
        let reserved = registry.reserve();
        registry.remove(first);
        let second = registry.insert("b");
        assert_eq!([first, reserved, second], [1, 2, 3]);
        assert!(registry.get(first).is_none());
        assert_eq!(registry.get(second), Some(&"b"));
    }
}
