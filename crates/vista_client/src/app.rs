use std::fmt;
use std::path::Path;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use tracing::{debug, error, info, warn};
use vista_core::diagnostics::TracingSink;
use vista_core::portal::PortalAnchor;
use vista_core::state::AppState;
use vista_core::transition::TransitionStep;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::input::InputState;
use crate::model::{ModelData, ModelLoadError};
use crate::pacing::FramePacer;
use crate::renderer::mesh::model_transform;
use crate::renderer::uniforms::FrameParams;
use crate::renderer::{Renderer, RendererInitError, SceneAssets};
use crate::settings::{load_or_create_settings, Settings, SETTINGS_PATH};

const WINDOW_TITLE: &str = "Picture Projections Prototype";
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

#[derive(Debug)]
pub enum AppError {
    Model(ModelLoadError),
    Renderer(RendererInitError),
    Window(winit::error::OsError),
    EventLoop(winit::error::EventLoopError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(err) => write!(f, "failed to load scene: {err}"),
            Self::Renderer(err) => write!(f, "failed to initialize renderer: {err}"),
            Self::Window(err) => write!(f, "failed to create window: {err}"),
            Self::EventLoop(err) => write!(f, "event loop error: {err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ModelLoadError> for AppError {
    fn from(err: ModelLoadError) -> Self {
        Self::Model(err)
    }
}

impl From<RendererInitError> for AppError {
    fn from(err: RendererInitError) -> Self {
        Self::Renderer(err)
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(err: winit::error::EventLoopError) -> Self {
        Self::EventLoop(err)
    }
}

/// Both models plus what was derived from them at load time.
struct LoadedScene {
    gallery: ModelData,
    island: ModelData,
    portal_mesh: usize,
    anchor: PortalAnchor,
}

impl LoadedScene {
    fn load(settings: &Settings) -> Result<Self, ModelLoadError> {
        let gallery = ModelData::load(&settings.gallery_model)?;
        let island = ModelData::load(&settings.island_model)?;
        let (portal_mesh, portal) = gallery.portal_mesh(settings.portal_material_index)?;
        debug!(
            "Portal mesh {portal_mesh} {:?} has {} vertices",
            portal.name,
            portal.vertex_count()
        );
        let anchor = gallery.portal_anchor(settings.portal_material_index, settings.gallery_scale)?;

        info!(
            "Loaded {} ({} meshes) and {} ({} meshes)",
            gallery.source.display(),
            gallery.meshes.len(),
            island.source.display(),
            island.meshes.len()
        );
        debug!("Portal anchor at {:?}", anchor.position());

        Ok(Self {
            gallery,
            island,
            portal_mesh,
            anchor,
        })
    }
}

struct VistaApp {
    settings: Settings,
    scene: LoadedScene,
    state: AppState,
    input: InputState,
    sink: TracingSink,
    pacer: FramePacer,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    cursor_grabbed: bool,
    failure: Option<AppError>,
}

impl VistaApp {
    fn new(settings: Settings) -> Result<Self, AppError> {
        let scene = LoadedScene::load(&settings)?;
        let state = AppState::new(settings.scene_config(), scene.anchor);
        let pacer = FramePacer::new(settings.target_fps);
        debug!("Frame budget {:?}", pacer.target_frame_time());

        Ok(Self {
            settings,
            scene,
            state,
            input: InputState::default(),
            sink: TracingSink,
            pacer,
            window: None,
            renderer: None,
            cursor_grabbed: false,
            failure: None,
        })
    }

    fn init_renderer(&mut self, window: Arc<Window>) -> Result<(), AppError> {
        let assets = SceneAssets {
            gallery: &self.scene.gallery,
            gallery_transform: model_transform(self.settings.gallery_scale, Vec3::ZERO),
            island: &self.scene.island,
            island_transform: model_transform(
                self.settings.island_scale,
                Vec3::from_array(self.settings.island_offset),
            ),
            portal_mesh: self.scene.portal_mesh,
        };
        let mut renderer = Renderer::new(window, &assets)?;

        // The surface shows the off-screen target even before the portal is
        // first enabled, so fill it once from the waypoint.
        let view = self.state.bootstrap_portal_view();
        let params = frame_params(&self.state, renderer.size());
        renderer.render_portal(&view, self.state.camera.fovy, &params);
        let (target_width, target_height) = renderer.portal_target_size();
        debug!("Portal target {target_width}x{target_height} primed from the waypoint");

        self.renderer = Some(renderer);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn set_cursor_grab(&mut self, enabled: bool) {
        let Some(window) = self.window.as_ref() else {
            self.cursor_grabbed = false;
            return;
        };

        let grabbed = if enabled {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
                .is_ok()
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            false
        };

        if enabled && !grabbed {
            warn!("Cursor grab unavailable; mouse look may drift");
        }

        window.set_cursor_visible(!grabbed);
        self.cursor_grabbed = grabbed;
    }

    fn update_and_render(&mut self, event_loop: &ActiveEventLoop) {
        let _frame = self.pacer.begin_frame();

        let frame_input = self.input.frame_input(&self.settings);
        let was_transitioning = self.state.transition.is_active();
        let was_portal = self.state.portal_enabled;
        let output = self.state.update(&frame_input, &mut self.sink);
        self.input.clear_frame();

        if output.portal_enabled != was_portal {
            info!(
                "Portal view {}",
                if output.portal_enabled { "enabled" } else { "disabled" }
            );
        }
        if !was_transitioning && self.state.transition.is_active() {
            info!("Moving to portal viewpoint");
        }
        if output.transition == TransitionStep::Arrived {
            info!("Reached portal viewpoint");
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let params = frame_params(&self.state, renderer.size());
        if let Some(view) = output.portal_view.as_ref() {
            renderer.render_portal(view, output.camera.fovy, &params);
        }

        match renderer.render_frame(&output.camera, &params) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                if let Some(window) = self.window.as_ref() {
                    let size = window.inner_size();
                    renderer.resize(size.width, size.height);
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Surface out of memory; shutting down");
                event_loop.exit();
            }
            Err(err) => {
                debug!("Skipping frame: {err}");
            }
        }
    }
}

fn frame_params(state: &AppState, (screen_width, screen_height): (u32, u32)) -> FrameParams {
    FrameParams {
        light: state.light,
        ambient: state.ambient,
        is_portal: state.portal_enabled,
        screen_width,
        screen_height,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_LINE,
    }
}

impl ApplicationHandler for VistaApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(
                self.settings.window_width as f64,
                self.settings.window_height as f64,
            ));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                match self.init_renderer(window.clone()) {
                    Ok(()) => {
                        info!("Window and renderer initialized");
                        self.window = Some(window);
                        self.set_cursor_grab(true);
                    }
                    Err(err) => self.fail(event_loop, err),
                }
            }
            Err(err) => self.fail(event_loop, AppError::Window(err)),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|window| window.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested; shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };

                match event.state {
                    ElementState::Pressed if code == KeyCode::Escape => {
                        info!("Escape pressed; shutting down");
                        event_loop.exit();
                    }
                    ElementState::Pressed => self.input.press_key(code),
                    ElementState::Released => self.input.release_key(code),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.add_scroll(scroll_lines(delta));
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !self.cursor_grabbed {
                    self.set_cursor_grab(true);
                }
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
                self.set_cursor_grab(false);
            }
            WindowEvent::Resized(size) => {
                info!("Window resized to {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.update_and_render(event_loop);
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if !self.cursor_grabbed {
            return;
        }

        if let DeviceEvent::MouseMotion { delta } = event {
            self.input
                .add_mouse_delta(Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn run_app(settings_path: &Path) -> Result<(), AppError> {
    let settings = load_or_create_settings(settings_path);
    let mut app = VistaApp::new(settings)?;

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn run() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
    info!("Picture projections prototype starting");

    if let Err(err) = run_app(Path::new(SETTINGS_PATH)) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use vista_core::portal::PortalAnchor;
    use winit::dpi::PhysicalPosition;
    use winit::event::MouseScrollDelta;

    use super::{frame_params, scroll_lines, AppError};
    use crate::model::ModelLoadError;
    use crate::settings::Settings;
    use vista_core::state::AppState;

    #[test]
    fn frame_params_follow_state_and_window() {
        let mut state = AppState::new(
            Settings::default().scene_config(),
            PortalAnchor::new(glam::Vec3::new(3.0, 2.0, -4.0)),
        );
        state.portal_enabled = true;

        let params = frame_params(&state, (1500, 800));
        assert!(params.is_portal);
        assert_eq!(params.screen_width, 1500);
        assert_eq!(params.screen_height, 800);
        assert_eq!(params.light, state.light);
        assert_eq!(params.ambient, state.ambient);
    }

    #[test]
    fn wheel_deltas_become_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -1.0)), -1.0);
        assert_eq!(
            scroll_lines(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0))),
            2.0
        );
    }

    #[test]
    fn missing_portal_mesh_reads_clearly() {
        let err = AppError::from(ModelLoadError::MissingPortalMesh { material_index: 4 });
        assert_eq!(
            err.to_string(),
            "failed to load scene: no mesh uses portal material 4"
        );
    }
}
