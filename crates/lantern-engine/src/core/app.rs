use crate::render::RenderCtx;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by the viewer.
pub trait App {
    /// Called once after the window and GPU exist, before the first frame.
    /// An error stops the runtime and is returned from `Runtime::run`.
    fn on_start(&mut self, ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once after the window and GPU exist, then again on every
    /// resize, with the drawable size in physical pixels. A zero height is
    /// passed through as-is; projections should treat it as one.
    fn on_resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
