//! The scene viewer application: setup, per-frame update and rendering, debug UI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::backend::traits::*;
use crate::backend::types::VertexSemantic;
use crate::error::{ViewerError, ViewerResult};
use crate::renderer::{ForwardRenderPass, Renderer, SkyboxRenderPass, UpdateTransformsFn};
use crate::resources::{CubemapLoader, Material, MaterialProperty, Model, ModelLoader, Texture};
use crate::scene::{
    Camera, CameraController, CameraInput, FreeFlyController, GuiSceneVisitor, PointLight,
    RendererSceneVisitor, Scene, SceneNode,
};
use crate::shader::{ShaderLoader, ShaderProgram, ShaderStage};
use crate::ui::{broadcast, SurfaceGui, SurfaceParameters, UniformUpdate};

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const CLEAR_DEPTH: f32 = 1.0;

pub const VERTEX_SHADER_PATHS: [&str; 2] = ["shaders/common.wgsl", "shaders/default_vert.wgsl"];
pub const FRAGMENT_SHADER_PATHS: [&str; 5] = [
    "shaders/common.wgsl",
    "shaders/utils.wgsl",
    "shaders/bsdf.wgsl",
    "shaders/lighting.wgsl",
    "shaders/default_pbr.wgsl",
];
pub const MODEL_PATH: &str = "models/tea_set/tea_set.obj";
pub const SKYBOX_PATH: &str = "models/skybox/pamp-env.hdr";

/// Uniforms written by the renderer rather than stored in materials
pub const RENDERER_UNIFORMS: [&str; 8] = [
    "CameraPosition",
    "WorldMatrix",
    "ViewProjMatrix",
    "LightIndirect",
    "LightColor",
    "LightPosition",
    "LightDirection",
    "LightAttenuation",
];

const SKYBOX_FACE_SIZE: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    Uninitialized,
    Initialized,
    Running,
    CleanedUp,
}

impl ApplicationState {
    fn describe(self) -> &'static str {
        match self {
            ApplicationState::Uninitialized => "uninitialized",
            ApplicationState::Initialized => "initialized",
            ApplicationState::Running => "running",
            ApplicationState::CleanedUp => "cleaned up",
        }
    }
}

/// Loads a model with a PBR material, renders it over a skybox and exposes
/// the surface parameters in a debug UI.
///
/// Call [`initialize`](Self::initialize) once, then per frame
/// [`update`](Self::update), [`render`](Self::render) and
/// [`render_gui`](Self::render_gui), and finally [`cleanup`](Self::cleanup).
pub struct SceneViewerApplication<B: GraphicsBackend> {
    state: ApplicationState,
    asset_root: PathBuf,
    scene: Scene,
    renderer: Renderer<B>,
    camera: Arc<RwLock<Camera>>,
    camera_controller: Box<dyn CameraController>,
    program: Option<Arc<ShaderProgram>>,
    default_material: Option<Material>,
    skybox: Option<Arc<Texture>>,
    model: Option<Arc<RwLock<Model>>>,
    surface: SurfaceParameters,
}

impl<B: GraphicsBackend + 'static> SceneViewerApplication<B> {
    /// Asset paths are resolved against `asset_root`
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            state: ApplicationState::Uninitialized,
            asset_root: asset_root.into(),
            scene: Scene::new(),
            renderer: Renderer::new(),
            camera: Arc::new(RwLock::new(Camera::new())),
            camera_controller: Box::new(FreeFlyController::new()),
            program: None,
            default_material: None,
            skybox: None,
            model: None,
            surface: SurfaceParameters::default(),
        }
    }

    /// Set up camera, lights, material, models and renderer, in that order.
    ///
    /// On failure the application is returned to its pristine state.
    pub fn initialize(&mut self) -> ViewerResult<()> {
        self.require("initialize", &[ApplicationState::Uninitialized])?;

        match self.initialize_steps() {
            Ok(()) => {
                self.state = ApplicationState::Initialized;
                log::info!("Scene viewer initialized");
                Ok(())
            }
            Err(e) => {
                *self = Self::new(std::mem::take(&mut self.asset_root));
                Err(e)
            }
        }
    }

    /// Move the camera, then hand the scene to the renderer for the next frame
    pub fn update(&mut self, input: &CameraInput, delta_time: f32) -> ViewerResult<()> {
        self.require(
            "update",
            &[ApplicationState::Initialized, ApplicationState::Running],
        )?;
        self.state = ApplicationState::Running;

        self.camera_controller
            .update(&mut self.camera.write(), input, delta_time);

        let mut visitor = RendererSceneVisitor::new(&mut self.renderer);
        self.scene.accept_visitor(&mut visitor);
        Ok(())
    }

    /// Clear the frame, then run the render passes
    pub fn render(&mut self, backend: &mut B, frame: FrameContext) -> ViewerResult<()> {
        self.require("render", &[ApplicationState::Running])?;

        self.renderer
            .clear(backend, frame, CLEAR_COLOR, CLEAR_DEPTH)?;
        self.renderer.render(backend, frame)
    }

    /// Draw the debug UI; moved sliders are written into every material of
    /// the model before this returns
    pub fn render_gui(&mut self, ctx: &egui::Context) -> ViewerResult<()> {
        self.require("draw the GUI", &[ApplicationState::Running])?;

        let before = self.camera.read().clone();
        let scene = &mut self.scene;
        egui::Window::new("Scene").show(ctx, |ui| {
            scene.accept_visitor(&mut GuiSceneVisitor::new(ui));
        });
        self.follow_inspector_edits(&before);

        self.camera_controller.draw_gui(ctx);

        let updates = SurfaceGui::draw(ctx, &mut self.surface);
        self.apply_updates(&updates)
    }

    /// The controller keeps its own angles; re-derive them when the
    /// inspector moved the camera so the next update keeps the edit
    fn follow_inspector_edits(&mut self, before: &Camera) {
        let camera = self.camera.read();
        if *camera != *before {
            self.camera_controller.sync_with_camera(&camera);
        }
    }

    /// Write surface uniform changes into every material of the loaded model
    pub fn apply_updates(&mut self, updates: &[UniformUpdate]) -> ViewerResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let Some(model) = &self.model else {
            return Err(ViewerError::InvalidState {
                operation: "update materials",
                state: "no model is loaded",
            });
        };
        broadcast(updates, model.write().materials_mut())
    }

    /// Keep the projection's aspect ratio in step with the surface
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.write().set_aspect(width as f32, height as f32);
    }

    /// Release the scene and every loaded asset
    pub fn cleanup(&mut self) -> ViewerResult<()> {
        self.require(
            "clean up",
            &[ApplicationState::Initialized, ApplicationState::Running],
        )?;

        self.scene = Scene::new();
        self.renderer = Renderer::new();
        self.model = None;
        self.default_material = None;
        self.skybox = None;
        self.program = None;
        self.state = ApplicationState::CleanedUp;
        log::info!("Scene viewer cleaned up");
        Ok(())
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn camera(&self) -> &Arc<RwLock<Camera>> {
        &self.camera
    }

    pub fn model(&self) -> Option<&Arc<RwLock<Model>>> {
        self.model.as_ref()
    }

    pub fn shader_program(&self) -> Option<&Arc<ShaderProgram>> {
        self.program.as_ref()
    }

    /// The material every sub-material was cloned from
    pub fn default_material(&self) -> Option<&Material> {
        self.default_material.as_ref()
    }

    pub fn surface_parameters(&self) -> &SurfaceParameters {
        &self.surface
    }

    fn require(&self, operation: &'static str, allowed: &[ApplicationState]) -> ViewerResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ViewerError::InvalidState {
                operation,
                state: self.state.describe(),
            })
        }
    }

    fn initialize_steps(&mut self) -> ViewerResult<()> {
        self.initialize_camera()?;
        self.initialize_lights()?;
        self.initialize_material()?;
        self.initialize_models()?;
        self.initialize_renderer()
    }

    fn initialize_camera(&mut self) -> ViewerResult<()> {
        {
            let mut camera = self.camera.write();
            camera.set_view(Vec3::new(-1.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y);
            camera.set_perspective(1.0, 1.0, 0.1, 100.0);
            self.camera_controller.sync_with_camera(&camera);
        }
        self.scene
            .add_node(SceneNode::camera("camera", Arc::clone(&self.camera)));
        Ok(())
    }

    fn initialize_lights(&mut self) -> ViewerResult<()> {
        let light = PointLight::new(Vec3::new(0.0, 2.0, 0.0)).with_attenuation(5.0, 10.0);
        self.scene
            .add_node(SceneNode::light("point light", Arc::new(RwLock::new(light))));
        Ok(())
    }

    fn initialize_material(&mut self) -> ViewerResult<()> {
        let vertex = ShaderLoader::new(ShaderStage::Vertex)
            .with_root(&self.asset_root)
            .load(&VERTEX_SHADER_PATHS)?;
        let fragment = ShaderLoader::new(ShaderStage::Fragment)
            .with_root(&self.asset_root)
            .load(&FRAGMENT_SHADER_PATHS)?;
        let program = Arc::new(ShaderProgram::build(vertex, fragment)?);

        let update_transforms: UpdateTransformsFn = Box::new(|uniforms, world, camera, camera_changed| {
            if camera_changed {
                uniforms.set("CameraPosition", camera.extract_translation())?;
                uniforms.set("ViewProjMatrix", camera.view_projection_matrix())?;
            }
            uniforms.set("WorldMatrix", world)
        });
        let update_lights = self.renderer.default_update_lights_function();
        self.renderer
            .register_shader_program(Arc::clone(&program), update_transforms, update_lights);

        let material = Material::new(Arc::clone(&program), &RENDERER_UNIFORMS).with_name("default");
        log::info!(
            "Default material has {} uniforms",
            material.uniform_names().count()
        );
        self.default_material = Some(material);
        self.program = Some(program);
        Ok(())
    }

    fn initialize_models(&mut self) -> ViewerResult<()> {
        let Some(material) = self.default_material.as_mut() else {
            return Err(ViewerError::InvalidState {
                operation: "load models",
                state: "the default material is missing",
            });
        };

        let skybox = CubemapLoader::new()
            .with_face_size(SKYBOX_FACE_SIZE)
            .load(self.asset_root.join(SKYBOX_PATH))?;
        let max_lod = skybox.max_lod();

        material.set_uniform_value("AmbientColor", Vec3::splat(0.25))?;
        material.set_uniform_value("EnvironmentTexture", Arc::clone(&skybox))?;
        material.set_uniform_value("EnvironmentMaxLod", max_lod)?;
        material.set_uniform_value("Color", Vec3::ONE)?;
        broadcast(&self.surface.all_updates(), std::slice::from_mut(material))?;

        let mut loader = ModelLoader::new(material.clone());
        loader.set_create_materials(true);
        loader.texture_loader_mut().set_flip_vertical(true);

        loader.set_material_attribute(VertexSemantic::Position, "VertexPosition");
        loader.set_material_attribute(VertexSemantic::Normal, "VertexNormal");
        loader.set_material_attribute(VertexSemantic::Tangent, "VertexTangent");
        loader.set_material_attribute(VertexSemantic::Bitangent, "VertexBitangent");
        loader.set_material_attribute(VertexSemantic::TexCoord0, "VertexTexCoord");

        loader.set_material_property(MaterialProperty::DiffuseColor, "Color");
        loader.set_material_property(MaterialProperty::DiffuseTexture, "ColorTexture");
        loader.set_material_property(MaterialProperty::NormalTexture, "NormalTexture");
        loader.set_material_property(MaterialProperty::SpecularTexture, "SpecularTexture");

        let model = Arc::new(RwLock::new(loader.load(self.asset_root.join(MODEL_PATH))?));
        self.scene
            .add_node(SceneNode::model("tea set", Arc::clone(&model)));
        self.model = Some(model);
        self.skybox = Some(skybox);
        Ok(())
    }

    fn initialize_renderer(&mut self) -> ViewerResult<()> {
        let Some(skybox) = &self.skybox else {
            return Err(ViewerError::InvalidState {
                operation: "set up the renderer",
                state: "no skybox is loaded",
            });
        };

        self.renderer.add_render_pass(Box::new(ForwardRenderPass::new()));
        self.renderer
            .add_render_pass(Box::new(SkyboxRenderPass::new(Arc::clone(skybox))?));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn lifecycle_calls_out_of_order_are_rejected() {
        let mut app: SceneViewerApplication<DummyBackend> = SceneViewerApplication::new(".");
        let mut backend = DummyBackend::default();
        let frame = backend.begin_frame().unwrap();

        assert!(matches!(
            app.update(&CameraInput::default(), 0.016),
            Err(ViewerError::InvalidState { .. })
        ));
        assert!(matches!(
            app.render(&mut backend, frame),
            Err(ViewerError::InvalidState { .. })
        ));
        assert!(matches!(app.cleanup(), Err(ViewerError::InvalidState { .. })));
        assert_eq!(app.state(), ApplicationState::Uninitialized);
    }

    #[test]
    fn failed_initialization_leaves_a_clean_application() {
        let root = std::env::temp_dir().join("scene-viewer-app-missing-assets");
        let mut app: SceneViewerApplication<DummyBackend> = SceneViewerApplication::new(&root);

        let err = app.initialize().err().unwrap();
        assert!(matches!(err, ViewerError::Io { .. }));
        assert_eq!(app.state(), ApplicationState::Uninitialized);
        assert!(app.scene().nodes().is_empty());
        assert_eq!(app.asset_root(), root.as_path());
    }

    #[test]
    fn updates_without_a_model_are_rejected() {
        let mut app: SceneViewerApplication<DummyBackend> = SceneViewerApplication::new(".");
        assert!(app.apply_updates(&[]).is_ok());
        let updates = [UniformUpdate::new("Roughness", 0.1f32.into())];
        assert!(matches!(
            app.apply_updates(&updates),
            Err(ViewerError::InvalidState { .. })
        ));
    }

    #[test]
    fn inspector_target_edits_survive_the_next_update() {
        let mut app: SceneViewerApplication<DummyBackend> = SceneViewerApplication::new(".");
        app.initialize_camera().unwrap();

        let before = app.camera.read().clone();
        app.camera.write().target = Vec3::new(0.0, 1.0, -1.0);
        let edited = app.camera.read().forward();
        app.follow_inspector_edits(&before);

        let forward = CameraInput {
            forward: true,
            ..Default::default()
        };
        app.camera_controller
            .update(&mut app.camera.write(), &forward, 0.1);
        let camera = app.camera.read();
        assert!(camera.forward().abs_diff_eq(edited, 1e-5));
        let moved = (camera.position - before.position).normalize();
        assert!(moved.abs_diff_eq(edited, 1e-5));
    }
}
