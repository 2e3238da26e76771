//! End-to-end tests of the application lifecycle on the dummy backend.

mod common;

use common::AssetRoot;
use glam::Vec3;
use scene_viewer::backend::{DummyBackend, GraphicsBackend, LoadOp};
use scene_viewer::scene::CameraInput;
use scene_viewer::ui::UniformUpdate;
use scene_viewer::{ApplicationState, SceneViewerApplication, ViewerError};

type App = SceneViewerApplication<DummyBackend>;

fn initialized(assets: &AssetRoot) -> App {
    let mut app = App::new(assets.path());
    app.initialize().unwrap();
    app
}

fn material_vec3s(app: &App, name: &str) -> Vec<Vec3> {
    let model = app.model().unwrap().read();
    model
        .materials()
        .iter()
        .map(|m| m.get_vec3(name).unwrap())
        .collect()
}

fn gui_frame(app: &mut App, ctx: &egui::Context, events: Vec<egui::Event>) {
    let input = egui::RawInput {
        screen_rect: Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(1024.0, 1024.0),
        )),
        events,
        // a second apart, so consecutive clicks never pair into a double click
        time: Some(ctx.input(|i| i.time) + 1.0),
        ..Default::default()
    };
    let mut result = Ok(());
    let _ = ctx.run(input, |ctx| {
        result = app.render_gui(ctx);
    });
    result.unwrap();
}

fn click(app: &mut App, ctx: &egui::Context, pos: egui::Pos2) {
    let button = |pressed| egui::Event::PointerButton {
        pos,
        button: egui::PointerButton::Primary,
        pressed,
        modifiers: egui::Modifiers::NONE,
    };
    gui_frame(app, ctx, vec![egui::Event::PointerMoved(pos), button(true)]);
    gui_frame(app, ctx, vec![button(false)]);
}

/// Click down a column of `window` until `changed` reports an edit,
/// walking from the top or from the bottom of the window
fn click_slider_in(
    app: &mut App,
    ctx: &egui::Context,
    window: &str,
    from_top: bool,
    changed: impl Fn(&App) -> bool,
) {
    let id = egui::Id::new(window);
    let rect = ctx.memory(|m| m.area_rect(id)).unwrap();
    let layer = egui::LayerId::new(egui::Order::Middle, id);
    let x = rect.min.x + 40.0;
    let rows = ((rect.height() - 26.0) / 2.0) as usize;
    for row in 0..rows {
        let offset = 2.0 * row as f32;
        let y = if from_top {
            rect.min.y + 24.0 + offset
        } else {
            rect.max.y - 2.0 - offset
        };
        let pos = egui::pos2(x, y);
        if ctx.layer_id_at(pos) != Some(layer) {
            continue;
        }
        click(app, ctx, pos);
        if changed(app) {
            return;
        }
    }
    panic!("no slider in {window} responded");
}

fn material_floats(app: &App, name: &str) -> Vec<f32> {
    let model = app.model().unwrap().read();
    model
        .materials()
        .iter()
        .map(|m| m.get_float(name).unwrap())
        .collect()
}

#[test]
fn initializes_scene_from_assets() {
    let assets = AssetRoot::complete("init");
    let app = initialized(&assets);

    assert_eq!(app.state(), ApplicationState::Initialized);
    let names: Vec<&str> = app.scene().nodes().iter().map(|n| n.name()).collect();
    assert_eq!(names, ["camera", "point light", "tea set"]);
    assert_eq!(app.renderer().pass_names(), ["Forward", "Skybox"]);

    let model = app.model().unwrap().read();
    assert_eq!(model.material_count(), 3);
    assert_eq!(model.meshes().len(), 3);
    for material in model.materials() {
        assert!(material.get_texture("EnvironmentTexture").is_some());
        assert!(material.get_texture("NormalTexture").is_some());
        assert_eq!(material.get_float("Roughness"), Some(0.02));
        assert_eq!(material.get_float("RefractionIndex"), Some(1.5));
    }
}

#[test]
fn roughness_change_reaches_every_sub_material() {
    let assets = AssetRoot::complete("broadcast");
    let mut app = initialized(&assets);
    assert_eq!(material_floats(&app, "Roughness"), [0.02, 0.02, 0.02]);

    app.apply_updates(&[UniformUpdate::new("Roughness", 0.10f32.into())])
        .unwrap();

    assert_eq!(material_floats(&app, "Roughness"), [0.10, 0.10, 0.10]);
    assert_eq!(material_floats(&app, "RefractionIndex"), [1.5, 1.5, 1.5]);
}

#[test]
fn model_without_materials_uses_the_default() {
    let assets = AssetRoot::new("no-mtl")
        .with_shaders()
        .with_skybox()
        .with_model(0);
    let mut app = initialized(&assets);

    {
        let model = app.model().unwrap().read();
        assert_eq!(model.material_count(), 1);
        assert!(model.materials()[0].get_texture("ColorTexture").is_some());
    }

    app.apply_updates(&[UniformUpdate::new("RefractionIndex", 2.0f32.into())])
        .unwrap();
    assert_eq!(material_floats(&app, "RefractionIndex"), [2.0]);
}

#[test]
fn idle_gui_frames_leave_materials_untouched() {
    let assets = AssetRoot::complete("idle");
    let mut app = initialized(&assets);
    app.update(&CameraInput::default(), 0.016).unwrap();

    let revisions = |app: &App| -> Vec<u64> {
        let model = app.model().unwrap().read();
        model.materials().iter().map(|m| m.revision()).collect()
    };
    let before = revisions(&app);

    let ctx = egui::Context::default();
    for _ in 0..3 {
        let mut result = Ok(());
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            result = app.render_gui(ctx);
        });
        result.unwrap();
    }

    assert_eq!(revisions(&app), before);
    assert_eq!(material_floats(&app, "Roughness"), [0.02, 0.02, 0.02]);
}

#[test]
fn initialization_reports_the_first_missing_asset() {
    let assets = AssetRoot::new("missing-shaders");
    let err = App::new(assets.path()).initialize().unwrap_err();
    assert!(matches!(err, ViewerError::Io { .. }), "{err}");

    let assets = AssetRoot::new("missing-skybox").with_shaders();
    let err = App::new(assets.path()).initialize().unwrap_err();
    assert!(matches!(err, ViewerError::ImageLoad { .. }), "{err}");

    let assets = AssetRoot::new("missing-model").with_shaders().with_skybox();
    let mut app = App::new(assets.path());
    let err = app.initialize().unwrap_err();
    assert!(matches!(err, ViewerError::ModelLoad { .. }), "{err}");
    assert_eq!(app.state(), ApplicationState::Uninitialized);
    assert!(app.model().is_none());
    assert!(app.scene().nodes().is_empty());
}

#[test]
fn frame_clears_then_draws_forward_then_skybox() {
    let assets = AssetRoot::complete("frame");
    let mut app = initialized(&assets);
    let mut backend = DummyBackend::new(640, 480);
    app.resize(640, 480);

    let frame = backend.begin_frame().unwrap();
    app.update(&CameraInput::default(), 0.016).unwrap();
    assert_eq!(app.state(), ApplicationState::Running);
    assert_eq!(app.renderer().queued_model_count(), 1);

    app.render(&mut backend, frame).unwrap();
    backend.end_frame().unwrap();

    let passes = backend.take_passes();
    let labels: Vec<&str> = passes.iter().filter_map(|p| p.label.as_deref()).collect();
    assert_eq!(labels, ["Clear", "Forward", "Skybox"]);
    assert!(matches!(passes[0].color_load_ops[0], LoadOp::Clear(_)));
    assert_eq!(passes[1].draws.len(), 3);
    assert!(passes[1].draws.iter().all(|d| d.indexed && d.element_count == 6));
    assert_eq!(passes[2].draws.len(), 1);
    assert_eq!(backend.frames_presented(), 1);
    assert_eq!(app.renderer().queued_model_count(), 0);
}

#[test]
fn cleanup_ends_the_lifecycle() {
    let assets = AssetRoot::complete("cleanup");
    let mut app = initialized(&assets);
    app.update(&CameraInput::default(), 0.016).unwrap();
    app.cleanup().unwrap();

    assert_eq!(app.state(), ApplicationState::CleanedUp);
    assert!(app.model().is_none());
    assert!(matches!(app.initialize(), Err(ViewerError::InvalidState { .. })));
    assert!(matches!(
        app.update(&CameraInput::default(), 0.016),
        Err(ViewerError::InvalidState { .. })
    ));
}

#[test]
fn dragging_roughness_rewrites_every_material() {
    let assets = AssetRoot::complete("gui-roughness");
    let mut app = initialized(&assets);
    app.update(&CameraInput::default(), 0.016).unwrap();

    let ctx = egui::Context::default();
    gui_frame(&mut app, &ctx, Vec::new());
    gui_frame(&mut app, &ctx, Vec::new());

    click_slider_in(&mut app, &ctx, "Material Properties", false, |app| {
        material_floats(app, "Roughness")[0] != 0.02
    });

    let roughness = app.surface_parameters().roughness;
    assert_ne!(roughness, 0.02);
    assert_eq!(material_floats(&app, "Roughness"), [roughness; 3]);
    assert_eq!(material_floats(&app, "RefractionIndex"), [1.5; 3]);
    assert_eq!(material_vec3s(&app, "DebugColors"), [Vec3::ZERO; 3]);
}

#[test]
fn dragging_a_debug_color_rewrites_the_whole_vector() {
    let assets = AssetRoot::complete("gui-debug");
    let mut app = initialized(&assets);
    app.update(&CameraInput::default(), 0.016).unwrap();

    let ctx = egui::Context::default();
    gui_frame(&mut app, &ctx, Vec::new());
    gui_frame(&mut app, &ctx, Vec::new());

    click_slider_in(&mut app, &ctx, "Debug", true, |app| {
        material_vec3s(app, "DebugColors")[0] != Vec3::ZERO
    });

    let params = app.surface_parameters().clone();
    assert!(params.debug_colors.x > 0.0);
    assert_eq!(params.debug_colors.y, 0.0);
    assert_eq!(params.debug_colors.z, 0.0);
    assert_eq!(material_vec3s(&app, "DebugColors"), [params.debug_colors; 3]);
    assert_eq!(
        material_floats(&app, "ReflectionIntensity"),
        [params.reflection_intensity; 3]
    );
    assert_eq!(
        material_floats(&app, "RefractionIntensity"),
        [params.refraction_intensity; 3]
    );
    assert_eq!(material_floats(&app, "Roughness"), [0.02; 3]);
}

#[test]
fn update_moves_the_camera_and_queues_its_pose() {
    let assets = AssetRoot::complete("camera-pose");
    let mut app = initialized(&assets);
    let start = app.camera().read().position;
    assert_eq!(start, Vec3::new(-1.0, 1.0, 1.0));

    let input = CameraInput {
        forward: true,
        ..Default::default()
    };
    app.update(&input, 0.1).unwrap();

    let camera = app.camera().read().clone();
    assert_ne!(camera.position, start);
    assert_eq!(app.renderer().queued_camera(), Some(&camera));
}
