//! Window management and the frame loop using winit

use std::sync::Arc;
use std::time::Instant;

use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::application::SceneViewerApplication;
use crate::backend::traits::*;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::egui_integration::WgpuEguiIntegration;
use crate::error::{ViewerError, ViewerResult};
use crate::scene::CameraInput;
use crate::ViewerConfig;

/// Camera input gathered from window and device events between frames
#[derive(Debug, Default)]
struct InputGatherer {
    input: CameraInput,
}

impl InputGatherer {
    fn on_key(&mut self, key: KeyCode, pressed: bool) {
        let slot = match key {
            KeyCode::KeyW => &mut self.input.forward,
            KeyCode::KeyS => &mut self.input.backward,
            KeyCode::KeyA => &mut self.input.left,
            KeyCode::KeyD => &mut self.input.right,
            KeyCode::KeyE => &mut self.input.up,
            KeyCode::KeyQ => &mut self.input.down,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut self.input.sprint,
            _ => return,
        };
        *slot = pressed;
    }

    fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if button == MouseButton::Right {
            self.input.mouse_look_active = pressed;
        }
    }

    fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.input.mouse_look_active {
            self.input.mouse_delta += glam::Vec2::new(dx as f32, dy as f32);
        }
    }

    fn on_scroll(&mut self, delta: &MouseScrollDelta) {
        self.input.scroll_delta += match delta {
            MouseScrollDelta::LineDelta(_, y) => *y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
        };
    }

    /// Presses and scrolls taken by the UI stay there; releases always land
    /// so nothing is left held after a drag ends over a window
    fn on_window_event(&mut self, event: &WindowEvent, consumed_by_ui: bool) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                if let PhysicalKey::Code(key) = event.physical_key {
                    if !(pressed && consumed_by_ui) {
                        self.on_key(key, pressed);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                if !(pressed && consumed_by_ui) {
                    self.on_mouse_button(*button, pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed_by_ui => self.on_scroll(delta),
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    /// Keys and buttons are released when focus is lost
    fn release_all(&mut self) {
        self.input = CameraInput::default();
    }
}

/// Everything the frame loop drives
struct Viewer {
    window: Arc<WinitWindow>,
    backend: WgpuBackend,
    egui: WgpuEguiIntegration,
    app: SceneViewerApplication<WgpuBackend>,
    input: InputGatherer,
    last_frame: Instant,
    frame_number: u64,
}

impl Viewer {
    fn new(window: Arc<WinitWindow>, config: &ViewerConfig) -> ViewerResult<Self> {
        let backend = WgpuBackend::new(Arc::clone(&window), config.vsync)?;
        let egui = WgpuEguiIntegration::new(&backend, &window);

        let mut app = SceneViewerApplication::new(config.asset_root.clone());
        app.initialize()?;

        let mut viewer = Self {
            window,
            backend,
            egui,
            app,
            input: InputGatherer::default(),
            last_frame: Instant::now(),
            frame_number: 0,
        };
        let size = viewer.window.inner_size();
        viewer.resize(size.width, size.height);
        Ok(viewer)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
        let (surface_width, surface_height) = self.backend.surface_size();
        self.egui
            .set_surface_scale(width, height, surface_width, surface_height);
        self.app.resize(surface_width, surface_height);
        log::debug!("Resized to {}x{}", surface_width, surface_height);
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        let consumed = self.egui.on_window_event(&self.window, event);
        self.input.on_window_event(event, consumed);
    }

    /// Update, render the scene, then draw the debug UI on top
    fn frame(&mut self) -> ViewerResult<()> {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let frame = match self.backend.begin_frame() {
            Ok(frame) => frame,
            Err(BackendError::SurfaceLost) => {
                let size = self.window.inner_size();
                log::warn!("Surface lost, reconfiguring");
                self.resize(size.width, size.height);
                return Ok(());
            }
            Err(BackendError::AcquireImageFailed(reason)) => {
                log::warn!("Skipping frame: {}", reason);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.app.update(&self.input.input, delta_time)?;
        self.input.input.reset_deltas();
        self.app.render(&mut self.backend, frame)?;

        self.egui.begin_frame(&self.window);
        let gui = self.app.render_gui(self.egui.context());
        self.egui.end_frame(&self.window);
        self.egui.render(&mut self.backend, frame);

        self.backend.end_frame()?;
        self.frame_number += 1;
        gui
    }
}

/// Open the window and run the viewer until it is closed or `max_frames` is reached
pub fn run(config: ViewerConfig) -> ViewerResult<()> {
    let event_loop = EventLoop::new().map_err(|e| ViewerError::EventLoop(e.to_string()))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .map_err(|e| ViewerError::EventLoop(e.to_string()))?,
    );
    log::info!("Window created: {}x{}", config.width, config.height);

    let mut viewer = Viewer::new(window, &config)?;
    let mut fatal: Option<ViewerError> = None;

    event_loop
        .run(|event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        log::info!("Close requested");
                        elwt.exit();
                    }
                    WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
                    WindowEvent::RedrawRequested => {
                        if let Err(e) = viewer.frame() {
                            fatal = Some(e);
                            elwt.exit();
                            return;
                        }
                        if config
                            .max_frames
                            .is_some_and(|max| viewer.frame_number >= max)
                        {
                            log::info!("Reached max frames limit ({}), exiting", viewer.frame_number);
                            elwt.exit();
                        }
                    }
                    other => viewer.handle_window_event(&other),
                },
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } => viewer.input.on_mouse_motion(delta.0, delta.1),
                Event::AboutToWait => viewer.window.request_redraw(),
                Event::LoopExiting => {
                    if let Err(e) = viewer.app.cleanup() {
                        log::warn!("Cleanup failed: {}", e);
                    }
                }
                _ => {}
            }
        })
        .map_err(|e| ViewerError::EventLoop(e.to_string()))?;

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_camera_input() {
        let mut gatherer = InputGatherer::default();
        gatherer.on_key(KeyCode::KeyW, true);
        gatherer.on_key(KeyCode::ShiftLeft, true);
        gatherer.on_key(KeyCode::KeyZ, true);
        assert!(gatherer.input.forward);
        assert!(gatherer.input.sprint);

        gatherer.on_key(KeyCode::KeyW, false);
        assert!(!gatherer.input.forward);
    }

    #[test]
    fn mouse_motion_only_counts_while_looking() {
        let mut gatherer = InputGatherer::default();
        gatherer.on_mouse_motion(4.0, 2.0);
        assert_eq!(gatherer.input.mouse_delta, glam::Vec2::ZERO);

        gatherer.on_mouse_button(MouseButton::Right, true);
        gatherer.on_mouse_motion(4.0, 2.0);
        gatherer.on_mouse_motion(1.0, 0.0);
        assert_eq!(gatherer.input.mouse_delta, glam::Vec2::new(5.0, 2.0));

        gatherer.release_all();
        assert!(gatherer.input.is_idle());
    }

    #[test]
    fn releases_over_the_ui_still_reach_the_camera() {
        // SAFETY: the id is only compared, never handed to the platform
        let device_id = unsafe { winit::event::DeviceId::dummy() };
        let right = |state| WindowEvent::MouseInput {
            device_id,
            state,
            button: MouseButton::Right,
        };
        let mut gatherer = InputGatherer::default();

        gatherer.on_window_event(&right(ElementState::Pressed), false);
        assert!(gatherer.input.mouse_look_active);
        gatherer.on_window_event(&right(ElementState::Released), true);
        assert!(!gatherer.input.mouse_look_active);

        gatherer.on_window_event(&right(ElementState::Pressed), true);
        assert!(!gatherer.input.mouse_look_active);

        let wheel = WindowEvent::MouseWheel {
            device_id,
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: winit::event::TouchPhase::Moved,
        };
        gatherer.on_window_event(&wheel, true);
        assert_eq!(gatherer.input.scroll_delta, 0.0);
        gatherer.on_window_event(&wheel, false);
        assert_eq!(gatherer.input.scroll_delta, 1.0);
    }
}
