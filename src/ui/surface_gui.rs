//! Material tweaking windows

use super::parameters::{sliders_in, ParameterWindow, SurfaceParameters, UniformUpdate};

/// Draws the "Material Properties" and "Debug" windows
pub struct SurfaceGui;

impl SurfaceGui {
    /// Draw both windows, returning one update per slider the user moved
    pub fn draw(ctx: &egui::Context, params: &mut SurfaceParameters) -> Vec<UniformUpdate> {
        let mut updates = Vec::new();
        let right_top = ctx.screen_rect().right_top();
        for (window, offset) in [(ParameterWindow::MaterialProperties, 10.0), (ParameterWindow::Debug, 140.0)] {
            egui::Window::new(window.title())
                .pivot(egui::Align2::RIGHT_TOP)
                .default_pos(right_top + egui::vec2(-10.0, offset))
                .resizable(false)
                .show(ctx, |ui| {
                    for spec in sliders_in(window) {
                        let response = ui.add(
                            egui::Slider::new(params.field_mut(spec.field), spec.min..=spec.max)
                                .text(spec.label),
                        );
                        if response.changed() {
                            updates.push(params.update_for(spec));
                        }
                    }
                });
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_frames_emit_no_updates() {
        let ctx = egui::Context::default();
        let mut params = SurfaceParameters::default();
        for _ in 0..3 {
            let mut updates = Vec::new();
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                updates = SurfaceGui::draw(ctx, &mut params);
            });
            assert!(updates.is_empty());
        }
        assert_eq!(params, SurfaceParameters::default());
    }
}
