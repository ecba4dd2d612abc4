//! Demo runner: event loop, input routing, frame timing and the GUI overlay
//!
//! Controls:
//!   WASD        - Move camera
//!   Q/E         - Move down/up (also Ctrl/Space)
//!   Shift       - Sprint
//!   Right mouse - Look around
//!   Scroll      - Adjust speed
//!   F1          - Toggle GUI
//!   Escape      - Exit

use std::collections::VecDeque;
use std::time::Instant;

use thiserror::Error;
use winit::{
    event::{DeviceEvent, ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::backend::{BackendError, DepthTarget, Frame, WgpuBackend};
use crate::egui_integration::WgpuEguiIntegration;
use crate::resources::ResourceError;
use crate::scene::CameraInput;
use crate::window::{Window, WindowConfig};

/// Anything that can stop a demo from starting
#[derive(Error, Debug)]
pub enum DemoError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Runner behaviour not tied to the window itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub show_gui: bool,
    /// Exit after this many presented frames
    pub max_frames: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            show_gui: true,
            max_frames: None,
        }
    }
}

/// Averages frame times over the last 60 frames
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frame_times: VecDeque<f32>,
    fps: f32,
}

impl FrameTimer {
    const WINDOW: usize = 60;

    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(Self::WINDOW),
            fps: 0.0,
        }
    }

    pub fn record(&mut self, dt: f32) {
        if self.frame_times.len() >= Self::WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);

        let avg_dt = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Average frame time in milliseconds
    pub fn frame_ms(&self) -> f32 {
        if self.fps > 0.0 {
            1000.0 / self.fps
        } else {
            0.0
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// State the runner shares with a demo
pub struct AppContext {
    pub backend: WgpuBackend,
    pub depth: DepthTarget,
    pub window: Window,
    pub timer: FrameTimer,
    /// Seconds since the loop started
    pub elapsed: f32,
    pub frame_count: u64,
    camera_input: CameraInput,
    input_blocked: bool,
}

impl AppContext {
    /// Camera input for this frame, or `None` while the GUI has keyboard focus
    pub fn camera_input(&self) -> Option<&CameraInput> {
        (!self.input_blocked).then_some(&self.camera_input)
    }

    pub fn fps(&self) -> f32 {
        self.timer.fps()
    }

    pub fn frame_ms(&self) -> f32 {
        self.timer.frame_ms()
    }

    /// Surface size as floats, for camera aspect updates
    pub fn surface_extent(&self) -> (f32, f32) {
        let (width, height) = self.backend.surface_size();
        (width as f32, height as f32)
    }
}

/// Per-demo behaviour driven by [`run`]
pub trait DemoHandler {
    /// Advance simulation and camera
    fn update(&mut self, ctx: &mut AppContext, dt: f32);

    /// Build GUI windows; only called while the GUI is visible
    fn ui(&mut self, _ctx: &egui::Context) {}

    /// Record scene passes into the frame encoder
    fn render(&mut self, ctx: &AppContext, frame: &mut Frame);

    /// Called after the surface was resized
    fn resize(&mut self, _ctx: &AppContext) {}
}

struct RunnerState {
    egui: WgpuEguiIntegration,
    options: RunOptions,
    last_frame: Instant,
    start: Instant,
}

/// Open a window, build the demo with `build` and run until exit
pub fn run<H, F>(config: WindowConfig, options: RunOptions, build: F) -> Result<(), DemoError>
where
    H: DemoHandler,
    F: FnOnce(&mut AppContext) -> Result<H, DemoError>,
{
    let event_loop = EventLoop::new()?;
    let window = Window::new(&event_loop, &config)?;
    let backend = WgpuBackend::new(window.window_arc(), config.vsync)?;

    let info = backend.adapter_info();
    log::info!("Using {} ({:?})", info.name, info.backend);

    let (width, height) = backend.surface_size();
    let depth = DepthTarget::new(backend.device(), width, height);
    let mut egui = WgpuEguiIntegration::new(&backend, window.window());
    egui.set_surface_scale(config.width, config.height, width, height);

    let mut ctx = AppContext {
        backend,
        depth,
        window,
        timer: FrameTimer::new(),
        elapsed: 0.0,
        frame_count: 0,
        camera_input: CameraInput::new(),
        input_blocked: false,
    };

    let mut handler = build(&mut ctx)?;
    handler.resize(&ctx);

    log::info!("Controls: WASD move, Q/E down/up, Shift sprint, right mouse look, F1 GUI, Escape exit");

    let mut state = RunnerState {
        egui,
        options,
        last_frame: Instant::now(),
        start: Instant::now(),
    };

    event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => {
                let egui_consumed = state.egui.on_window_event(ctx.window.window(), &event);
                if !egui_consumed {
                    handle_window_event(&event, &mut ctx, &mut handler, &mut state, elwt);
                } else {
                    if let Some(release) = Release::from_event(&event) {
                        if release == Release::MouseLook {
                            ctx.window.set_cursor_grabbed(false);
                        }
                        release.apply(&mut ctx.camera_input);
                    }
                    match &event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(size) => {
                            resize(&mut ctx, &mut handler, &mut state, size.width, size.height)
                        }
                        WindowEvent::RedrawRequested => {
                            render_frame(&mut ctx, &mut handler, &mut state)
                        }
                        _ => {}
                    }
                }
            }
            Event::DeviceEvent { event, .. } => {
                let gui_wants_pointer =
                    state.options.show_gui && state.egui.wants_pointer_input();
                if !gui_wants_pointer {
                    handle_device_event(&event, &mut ctx.camera_input);
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                let dt = (now - state.last_frame).as_secs_f32();
                state.last_frame = now;
                ctx.elapsed = (now - state.start).as_secs_f32();
                ctx.timer.record(dt);

                ctx.input_blocked =
                    state.options.show_gui && state.egui.wants_keyboard_input();
                handler.update(&mut ctx, dt);
                ctx.camera_input.reset_deltas();

                if let Some(max) = state.options.max_frames {
                    if ctx.frame_count >= max {
                        log::info!("Rendered {} frames, exiting", ctx.frame_count);
                        elwt.exit();
                        return;
                    }
                }

                ctx.window.request_redraw();
            }
            Event::LoopExiting => {
                log::info!(
                    "Shutting down after {} frames ({:.1} FPS average)",
                    ctx.frame_count,
                    ctx.fps()
                );
            }
            _ => {}
        }
    })?;

    Ok(())
}

fn resize<H: DemoHandler>(
    ctx: &mut AppContext,
    handler: &mut H,
    state: &mut RunnerState,
    width: u32,
    height: u32,
) {
    if width == 0 || height == 0 {
        return;
    }
    ctx.backend.resize(width, height);
    let (surface_width, surface_height) = ctx.backend.surface_size();
    ctx.depth
        .ensure_size(ctx.backend.device(), surface_width, surface_height);
    state
        .egui
        .set_surface_scale(width, height, surface_width, surface_height);
    handler.resize(ctx);
}

fn render_frame<H: DemoHandler>(ctx: &mut AppContext, handler: &mut H, state: &mut RunnerState) {
    if state.options.show_gui {
        state.egui.begin_frame(ctx.window.window());
        handler.ui(state.egui.context());
        state.egui.end_frame(ctx.window.window());
    }

    let mut frame = match ctx.backend.begin_frame() {
        Ok(frame) => frame,
        Err(BackendError::SurfaceLost) => {
            log::warn!("Surface lost, reconfigured; skipping frame");
            return;
        }
        Err(err) => {
            log::error!("Failed to begin frame: {}", err);
            return;
        }
    };

    ctx.depth
        .ensure_size(ctx.backend.device(), frame.width, frame.height);
    handler.render(ctx, &mut frame);

    if state.options.show_gui {
        state.egui.render(&ctx.backend, &mut frame);
    }

    ctx.backend.end_frame(frame);
    ctx.frame_count += 1;
}

fn handle_window_event<H: DemoHandler>(
    event: &WindowEvent,
    ctx: &mut AppContext,
    handler: &mut H,
    state: &mut RunnerState,
    elwt: &EventLoopWindowTarget<()>,
) {
    match event {
        WindowEvent::CloseRequested => {
            log::info!("Close requested, shutting down...");
            elwt.exit();
        }
        WindowEvent::Resized(size) => resize(ctx, handler, state, size.width, size.height),
        WindowEvent::RedrawRequested => render_frame(ctx, handler, state),
        WindowEvent::KeyboardInput { event, .. } => {
            let pressed = event.state == ElementState::Pressed;
            let PhysicalKey::Code(key) = event.physical_key else {
                return;
            };
            match key {
                KeyCode::Escape => elwt.exit(),
                KeyCode::F1 if pressed && !event.repeat => {
                    state.options.show_gui = !state.options.show_gui;
                    log::info!(
                        "GUI: {}",
                        if state.options.show_gui { "visible" } else { "hidden" }
                    );
                }
                _ => apply_key(&mut ctx.camera_input, key, pressed),
            }
        }
        WindowEvent::MouseInput {
            state: button_state,
            button: MouseButton::Right,
            ..
        } => {
            let pressed = *button_state == ElementState::Pressed;
            ctx.camera_input.mouse_look_active = pressed;
            ctx.window.set_cursor_grabbed(pressed);
        }
        WindowEvent::MouseWheel { delta, .. } => {
            ctx.camera_input.scroll_delta += scroll_amount(delta);
        }
        WindowEvent::Focused(false) => {
            // Release all keys when window loses focus
            ctx.camera_input = CameraInput::new();
            ctx.window.set_cursor_grabbed(false);
        }
        _ => {}
    }
}

/// A key or button release that still reaches the camera when egui consumes
/// the event, so held movement never sticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Key(KeyCode),
    MouseLook,
}

impl Release {
    fn from_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Released => {
                match event.physical_key {
                    PhysicalKey::Code(key) => Some(Self::Key(key)),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Right,
                ..
            } => Some(Self::MouseLook),
            _ => None,
        }
    }

    fn apply(self, input: &mut CameraInput) {
        match self {
            Self::Key(key) => apply_key(input, key, false),
            Self::MouseLook => input.mouse_look_active = false,
        }
    }
}

/// Map a movement key onto the camera input flags
pub fn apply_key(input: &mut CameraInput, key: KeyCode, pressed: bool) {
    match key {
        KeyCode::KeyW => input.forward = pressed,
        KeyCode::KeyS => input.backward = pressed,
        KeyCode::KeyA => input.left = pressed,
        KeyCode::KeyD => input.right = pressed,
        KeyCode::KeyQ | KeyCode::ControlLeft => input.down = pressed,
        KeyCode::KeyE | KeyCode::Space => input.up = pressed,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => input.sprint = pressed,
        _ => {}
    }
}

fn scroll_amount(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => *y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
    }
}

fn handle_device_event(event: &DeviceEvent, input: &mut CameraInput) {
    if let DeviceEvent::MouseMotion { delta } = event {
        if input.mouse_look_active {
            input.mouse_delta.x += delta.0 as f32;
            input.mouse_delta.y += delta.1 as f32;
        }
    }
}
