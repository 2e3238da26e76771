//! Forward rendering pass

use crate::backend::traits::*;
use crate::error::ViewerResult;

use super::pass::{PassContext, RenderPass};

/// Draws every queued model onto the frame, depth-tested against the
/// renderer's depth target
#[derive(Debug, Default)]
pub struct ForwardRenderPass;

impl ForwardRenderPass {
    pub fn new() -> Self {
        Self
    }
}

impl<B: GraphicsBackend> RenderPass<B> for ForwardRenderPass {
    fn name(&self) -> &str {
        "Forward"
    }

    fn render(&mut self, ctx: &mut PassContext<'_, B>) -> ViewerResult<()> {
        let depth_view = ctx.depth_view()?;
        let (width, height) = (ctx.frame.width, ctx.frame.height);

        ctx.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Forward".into()),
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
        ctx.backend
            .set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

        let result = ctx.state.draw_models(ctx.backend);
        ctx.backend.end_render_pass();

        let draws = result?;
        log::trace!("Forward pass drew {} meshes", draws);
        Ok(())
    }
}
