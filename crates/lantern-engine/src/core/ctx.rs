use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::paint::Color;
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;

use super::app::AppControl;

/// Window handle and metadata for the current frame.
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the next frame and records a pass clearing color to `clear`
    /// and depth to 1.0.
    ///
    /// On a surface error the returned `Err` carries what the caller should
    /// return from `on_frame`: `Exit` when the error is fatal, `Continue`
    /// when the frame is skipped.
    pub fn begin_frame(&mut self, clear: Color) -> Result<GpuFrame, AppControl> {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return Err(match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                });
            }
        };

        let mut target = RenderTarget::new(&mut frame.encoder, &frame.view, self.gpu.targets());
        target.clear(clear);

        Ok(frame)
    }

    /// Renderer context for the current window size and attachment setup.
    pub fn render_ctx(&self) -> RenderCtx<'_> {
        let (w, h) = self.window.logical_size();
        RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            Viewport::new(w, h),
            self.window.window.scale_factor() as f32,
            self.gpu.sample_count(),
        )
    }

    /// Submits the recorded commands and presents the frame.
    pub fn present(&mut self, frame: GpuFrame) {
        self.window.window.pre_present_notify();
        self.gpu.submit(frame);
    }
}
