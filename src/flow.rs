//! Windowed host and event loop.
//!
//! A [`SceneFlow`] builds its scene once in `on_init` and may mutate it every
//! frame in `on_update`. The host owns the window, the [`Context`] and the
//! [`DeferredRenderer`], drives the free-fly camera from keyboard and mouse
//! input, and renders the [`World`] every redraw.
//!
//! # Keys
//!
//! - F1 toggles between the composited image and the debug mosaic
//! - Escape quits
//! - WASD / Space / Ctrl move, Shift sprints, right mouse button looks around

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    camera::{Camera, CameraController, InputState},
    config::RendererConfig,
    context::Context,
    data_structures::scene::{Assets, Scene},
    renderer::DeferredRenderer,
};

/// Everything a flow renders: the scene, the assets it references and the
/// camera looking at it.
#[derive(Debug, Default)]
pub struct World {
    pub scene: Scene,
    pub assets: Assets,
    pub camera: Camera,
    /// Read once, after `on_init`, to build the renderer.
    pub config: RendererConfig,
}

/// Per-frame data handed to [`SceneFlow::on_update`].
#[derive(Debug)]
pub struct FrameTick<'a> {
    pub dt: Duration,
    pub input: &'a InputState,
    pub viewport: (u32, u32),
}

pub trait SceneFlow {
    /// Builds the scene. Runs once, before the renderer exists, so the flow
    /// may also adjust `world.config`.
    fn on_init(&mut self, ctx: &Context, world: &mut World) -> anyhow::Result<()>;

    /// Called every frame after the camera controller has moved the camera.
    fn on_update(&mut self, _ctx: &Context, _world: &mut World, _tick: &FrameTick<'_>) {}

    fn on_window_event(&mut self, _ctx: &Context, _world: &mut World, _event: &WindowEvent) {}
}

struct AppState {
    ctx: Context,
    renderer: DeferredRenderer,
    world: World,
}

pub struct App<F: SceneFlow> {
    async_runtime: tokio::runtime::Runtime,
    flow: F,
    state: Option<AppState>,
    input: InputState,
    controller: CameraController,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<F: SceneFlow> App<F> {
    fn new(async_runtime: tokio::runtime::Runtime, flow: F) -> Self {
        Self {
            async_runtime,
            flow,
            state: None,
            input: InputState::default(),
            controller: CameraController::default(),
            last_time: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, window: Arc<Window>) -> anyhow::Result<AppState> {
        let ctx = self.async_runtime.block_on(Context::new(window))?;
        let mut world = World {
            config: RendererConfig::from_env(),
            ..Default::default()
        };
        world.camera.update(ctx.size());
        self.flow.on_init(&ctx, &mut world)?;
        let renderer = DeferredRenderer::new(&ctx, world.config.clone())?;
        Ok(AppState {
            ctx,
            renderer,
            world,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let Some(state) = &mut self.state else {
            return;
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();

        let viewport = state.ctx.size();
        let camera = &mut state.world.camera;
        self.controller
            .update_camera(camera, &self.input, dt.as_secs_f32());
        camera.update(viewport);
        self.flow.on_update(
            &state.ctx,
            &mut state.world,
            &FrameTick {
                dt,
                input: &self.input,
                viewport,
            },
        );
        // the flow may have moved the camera
        state.world.camera.update(viewport);
        self.input.end_frame();

        if let Err(e) = state.renderer.render_to_surface(
            &state.ctx,
            &state.world.scene,
            &state.world.assets,
            &state.world.camera,
        ) {
            log::error!("unable to render: {e}");
        }
        state.ctx.request_redraw();
    }

    fn key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode, pressed: bool, repeat: bool) {
        if pressed {
            self.input.keys.insert(code);
        } else {
            self.input.keys.remove(&code);
        }
        if !pressed || repeat {
            return;
        }
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::F1 => {
                if let Some(state) = &mut self.state {
                    state.renderer.toggle_output_mode();
                }
            }
            _ => {}
        }
    }
}

impl<F: SceneFlow> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("deferred-ngin");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::anyhow!("cannot create window: {e}")),
        };
        match self.init(window) {
            Ok(state) => {
                state.ctx.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.mouse_delta.0 += dx;
            self.input.mouse_delta.1 += dy;
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            self.flow
                .on_window_event(&state.ctx, &mut state.world, &event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key(event_loop, code, event.state.is_pressed(), event.repeat);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.input.buttons.insert(button);
                }
                ElementState::Released => {
                    self.input.buttons.remove(&button);
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.renderer.dispose();
            state.world.assets.dispose();
        }
    }
}

/// Opens a window and runs `flow` until the window closes.
pub fn run<F: SceneFlow>(flow: F) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let async_runtime = tokio::runtime::Runtime::new()?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(async_runtime, flow);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
