//! Render pass trait and the context passes execute in

use crate::backend::traits::*;
use crate::error::ViewerResult;
use crate::scene::Camera;

use super::RendererState;

/// Context handed to each pass during [`super::Renderer::render`]
pub struct PassContext<'a, B: GraphicsBackend> {
    pub backend: &'a mut B,
    pub frame: FrameContext,
    pub(crate) state: &'a mut RendererState,
}

impl<'a, B: GraphicsBackend> PassContext<'a, B> {
    /// Camera submitted for this frame
    pub fn camera(&self) -> Option<&Camera> {
        self.state.queue.camera.as_ref()
    }

    /// Renderer-owned depth target sized to the frame
    pub fn depth_view(&mut self) -> ViewerResult<TextureViewHandle> {
        self.state
            .gpu
            .depth_view(self.backend, self.frame.width, self.frame.height)
    }

    pub fn sampler(&mut self) -> ViewerResult<SamplerHandle> {
        self.state.gpu.sampler(self.backend)
    }
}

/// A step of the frame, executed in registration order
pub trait RenderPass<B: GraphicsBackend> {
    fn name(&self) -> &str;

    fn render(&mut self, ctx: &mut PassContext<'_, B>) -> ViewerResult<()>;
}
