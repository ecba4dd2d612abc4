//! Window management using winit

use std::sync::Arc;
use winit::{
    dpi::PhysicalSize,
    error::OsError,
    event_loop::EventLoopWindowTarget,
    window::{CursorGrabMode, Window as WinitWindow, WindowBuilder},
};

/// Settings for opening the demo window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Reflectance Lab".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Wrapper around winit window that remembers the cursor grab state
pub struct Window {
    window: Arc<WinitWindow>,
    cursor_grabbed: bool,
}

impl Window {
    pub fn new(event_loop: &EventLoopWindowTarget<()>, config: &WindowConfig) -> Result<Self, OsError> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(&config.title)
                .with_inner_size(PhysicalSize::new(config.width, config.height))
                .build(event_loop)?,
        );

        Ok(Self {
            window,
            cursor_grabbed: false,
        })
    }

    /// Get the raw window for egui
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    /// Shared handle for surface creation
    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Confine and hide the cursor for mouse-look, or release it
    pub fn set_cursor_grabbed(&mut self, grabbed: bool) {
        if grabbed == self.cursor_grabbed {
            return;
        }
        let mode = if grabbed {
            CursorGrabMode::Confined
        } else {
            CursorGrabMode::None
        };
        if let Err(err) = self.window.set_cursor_grab(mode) {
            log::warn!("Cursor grab {:?} failed: {}", mode, err);
        }
        self.window.set_cursor_visible(!grabbed);
        self.cursor_grabbed = grabbed;
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
