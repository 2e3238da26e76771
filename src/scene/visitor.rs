//! Scene visitors: one feeds the renderer, one draws the scene inspector

use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::traits::GraphicsBackend;
use crate::renderer::Renderer;
use crate::resources::Model;

use super::{Camera, PointLight, SceneVisitor, Transform};

/// Pushes every node into the renderer's queue for the coming frame
pub struct RendererSceneVisitor<'a, B: GraphicsBackend> {
    renderer: &'a mut Renderer<B>,
}

impl<'a, B: GraphicsBackend> RendererSceneVisitor<'a, B> {
    pub fn new(renderer: &'a mut Renderer<B>) -> Self {
        Self { renderer }
    }
}

impl<B: GraphicsBackend> SceneVisitor for RendererSceneVisitor<'_, B> {
    fn visit_camera(&mut self, _name: &str, camera: &Arc<RwLock<Camera>>) {
        self.renderer.set_camera(&camera.read());
    }

    fn visit_light(&mut self, _name: &str, light: &Arc<RwLock<PointLight>>) {
        self.renderer.add_light(&light.read());
    }

    fn visit_model(&mut self, _name: &str, model: &Arc<RwLock<Model>>, transform: &mut Transform) {
        self.renderer.add_model(Arc::clone(model), transform.matrix());
    }
}

/// Lists the scene's nodes inside an egui container with editable values
pub struct GuiSceneVisitor<'a> {
    ui: &'a mut egui::Ui,
}

impl<'a> GuiSceneVisitor<'a> {
    pub fn new(ui: &'a mut egui::Ui) -> Self {
        Self { ui }
    }
}

fn vec3_row(ui: &mut egui::Ui, label: &str, value: &mut glam::Vec3, speed: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut value.x).speed(speed).prefix("x: "));
        ui.add(egui::DragValue::new(&mut value.y).speed(speed).prefix("y: "));
        ui.add(egui::DragValue::new(&mut value.z).speed(speed).prefix("z: "));
    });
}

impl SceneVisitor for GuiSceneVisitor<'_> {
    fn visit_camera(&mut self, name: &str, camera: &Arc<RwLock<Camera>>) {
        egui::CollapsingHeader::new(egui::RichText::new(name).strong())
            .id_source(("camera", name))
            .show(self.ui, |ui| {
                let mut camera = camera.write();
                vec3_row(ui, "Position", &mut camera.position, 0.01);
                vec3_row(ui, "Target", &mut camera.target, 0.01);
            });
    }

    fn visit_light(&mut self, name: &str, light: &Arc<RwLock<PointLight>>) {
        egui::CollapsingHeader::new(egui::RichText::new(name).strong())
            .id_source(("light", name))
            .show(self.ui, |ui| {
                let mut light = light.write();
                vec3_row(ui, "Position", &mut light.position, 0.01);

                ui.horizontal(|ui| {
                    ui.label("Color");
                    let mut rgb = light.color.to_array();
                    if ui.color_edit_button_rgb(&mut rgb).changed() {
                        light.color = glam::Vec3::from_array(rgb);
                    }
                });
                ui.add(egui::Slider::new(&mut light.intensity, 0.0..=10.0).text("Intensity"));
                ui.horizontal(|ui| {
                    ui.label("Attenuation");
                    ui.add(egui::DragValue::new(&mut light.attenuation.x).speed(0.05).prefix("start: "));
                    ui.add(egui::DragValue::new(&mut light.attenuation.y).speed(0.05).prefix("end: "));
                });
            });
    }

    fn visit_model(&mut self, name: &str, model: &Arc<RwLock<Model>>, transform: &mut Transform) {
        egui::CollapsingHeader::new(egui::RichText::new(name).strong())
            .id_source(("model", name))
            .show(self.ui, |ui| {
                {
                    let model = model.read();
                    ui.label(
                        egui::RichText::new(format!(
                            "{} meshes, {} materials",
                            model.meshes().len(),
                            model.material_count()
                        ))
                        .weak(),
                    );
                }

                vec3_row(ui, "Position", &mut transform.position, 0.01);
                let mut euler = transform.euler();
                let before = euler;
                vec3_row(ui, "Rotation", &mut euler, 0.01);
                if euler != before {
                    transform.set_euler(euler);
                }
                vec3_row(ui, "Scale", &mut transform.scale, 0.01);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::scene::{Scene, SceneNode};
    use glam::Vec3;

    #[test]
    fn renderer_visitor_queues_every_node() {
        let camera = Arc::new(RwLock::new(Camera::new()));
        camera.write().set_view(Vec3::new(-1.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y);

        let mut scene = Scene::new();
        scene.add_node(SceneNode::camera("camera", Arc::clone(&camera)));
        scene.add_node(SceneNode::light("point light", Arc::default()));
        scene.add_node(SceneNode::model("tea set", Arc::default()));

        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        scene.accept_visitor(&mut RendererSceneVisitor::new(&mut renderer));

        assert_eq!(renderer.queued_camera(), Some(&*camera.read()));
        assert_eq!(renderer.queued_model_count(), 1);
    }

    #[test]
    fn gui_visitor_runs_inside_a_frame() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::light("point light", Arc::default()));
        scene.add_node(SceneNode::model("tea set", Arc::default()));

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::Window::new("Scene").show(ctx, |ui| {
                scene.accept_visitor(&mut GuiSceneVisitor::new(ui));
            });
        });
    }
}
