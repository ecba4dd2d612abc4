//! wgpu egui integration
//!
//! Provides egui rendering on top of the frame encoder. The GUI pass loads
//! whatever the scene passes wrote and draws on top.

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::backend::{Frame, WgpuBackend};

/// egui state, input translation and renderer for one window
pub struct WgpuEguiIntegration {
    /// egui context (shared state for UI)
    ctx: egui::Context,
    /// egui-winit state for input handling
    winit_state: egui_winit::State,
    /// egui-wgpu renderer for drawing
    renderer: egui_wgpu::Renderer,
    /// Cached paint jobs from last frame
    paint_jobs: Vec<egui::ClippedPrimitive>,
    /// Cached textures delta
    textures_delta: egui::TexturesDelta,
    /// Scale factor for input coordinates (surface size / window size)
    input_scale: f32,
}

impl WgpuEguiIntegration {
    pub fn new(backend: &WgpuBackend, window: &Window) -> Self {
        let ctx = egui::Context::default();

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let renderer = create_renderer(backend.device(), backend.surface_format());

        Self {
            ctx,
            winit_state,
            renderer,
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            input_scale: 1.0,
        }
    }

    /// Set the scale factor for input coordinates when the surface was
    /// clamped below the window size
    pub fn set_surface_scale(
        &mut self,
        window_width: u32,
        window_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) {
        if let Some(scale) =
            input_scale_for(window_width, window_height, surface_width, surface_height)
        {
            self.input_scale = scale;
        }
    }

    /// Forward a window event; returns true when egui consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let scaled_event = match event {
            WindowEvent::CursorMoved {
                device_id,
                position,
            } if self.input_scale != 1.0 => Some(WindowEvent::CursorMoved {
                device_id: *device_id,
                position: winit::dpi::PhysicalPosition::new(
                    position.x * self.input_scale as f64,
                    position.y * self.input_scale as f64,
                ),
            }),
            _ => None,
        };

        let event_to_use = scaled_event.as_ref().unwrap_or(event);
        self.winit_state.on_window_event(window, event_to_use).consumed
    }

    pub fn begin_frame(&mut self, window: &Window) {
        let mut raw_input = self.winit_state.take_egui_input(window);

        if self.input_scale != 1.0 {
            if let Some(rect) = &mut raw_input.screen_rect {
                rect.max.x *= self.input_scale;
                rect.max.y *= self.input_scale;
            }
        }

        self.ctx.begin_frame(raw_input);
    }

    pub fn end_frame(&mut self, window: &Window) {
        let full_output = self.ctx.end_frame();

        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        self.paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.textures_delta = full_output.textures_delta;
    }

    /// Record the GUI pass into the frame encoder
    pub fn render(&mut self, backend: &WgpuBackend, frame: &mut Frame) {
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [frame.width, frame.height],
            pixels_per_point: self.ctx.pixels_per_point(),
        };

        let device = backend.device();
        let queue = backend.queue();

        for (id, image_delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let user_buffers = self.renderer.update_buffers(
            device,
            queue,
            &mut frame.encoder,
            &self.paint_jobs,
            &screen_descriptor,
        );
        if !user_buffers.is_empty() {
            queue.submit(user_buffers);
        }

        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .render(&mut pass, &self.paint_jobs, &screen_descriptor);
        }

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }

        self.textures_delta = egui::TexturesDelta::default();
    }

    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }

    /// Check if egui wants keyboard input
    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    /// Check if egui wants pointer input
    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input()
    }
}

/// GUI renderer drawing straight into the swapchain format: no depth, single sample
fn create_renderer(device: &wgpu::Device, format: wgpu::TextureFormat) -> egui_wgpu::Renderer {
    egui_wgpu::Renderer::new(device, format, None, 1)
}

/// Cursor scale when the surface was clamped below the window size
fn input_scale_for(
    window_width: u32,
    window_height: u32,
    surface_width: u32,
    surface_height: u32,
) -> Option<f32> {
    if window_width == 0 || window_height == 0 {
        return None;
    }
    let scale_x = surface_width as f32 / window_width as f32;
    let scale_y = surface_height as f32 / window_height as f32;
    Some(scale_x.min(scale_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_constructor_matches_egui_wgpu() {
        // Fails to build if the helper and egui-wgpu disagree on arity
        let upstream: fn(
            &wgpu::Device,
            wgpu::TextureFormat,
            Option<wgpu::TextureFormat>,
            u32,
        ) -> egui_wgpu::Renderer = egui_wgpu::Renderer::new;
        let ours: fn(&wgpu::Device, wgpu::TextureFormat) -> egui_wgpu::Renderer = create_renderer;
        let _ = (upstream, ours);
    }

    #[test]
    fn unclamped_surface_keeps_unit_scale() {
        assert_eq!(input_scale_for(1280, 720, 1280, 720), Some(1.0));
    }

    #[test]
    fn clamped_surface_scales_cursor_down() {
        assert_eq!(input_scale_for(16384, 8192, 8192, 4096), Some(0.5));
        assert_eq!(input_scale_for(0, 720, 1, 1), None);
    }
}
