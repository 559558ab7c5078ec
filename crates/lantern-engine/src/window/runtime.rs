use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::{InputFrame, InputState};
use crate::render::RenderCtx;
use crate::time::{FrameClock, FrameTime};

use super::keymap::translate_input_event;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl RuntimeConfig {
    pub fn new(title: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            title: title.into(),
            initial_size: LogicalSize::new(width, height),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new("lantern", 640.0, 360.0)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, initializes the GPU and drives `app` until it exits
    /// or the window closes.
    ///
    /// Errors from window/GPU creation and from `App::on_start` are returned
    /// after the event loop has shut down.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        WindowEntryTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")
    }

    /// Hands the freshly created GPU to the app, then reports the initial size.
    fn start_app(&mut self, entry: &mut WindowEntry) -> Result<()> {
        let app = &mut self.app;

        entry.with_mut(|fields| -> Result<()> {
            log::info!("{}", fields.gpu.adapter_report());

            let size = fields.gpu.size();
            let logical: LogicalSize<f64> = size.to_logical(fields.window.scale_factor());
            let rctx = RenderCtx::new(
                fields.gpu.device(),
                fields.gpu.queue(),
                fields.gpu.surface_format(),
                Viewport::new(logical.width as f32, logical.height as f32),
                fields.window.scale_factor() as f32,
                fields.gpu.sample_count(),
            );
            app.on_start(&rctx).context("application startup failed")?;
            app.on_resize(size.width, size.height);

            // Frame timing starts with the render loop, not with GPU setup.
            fields.clock.reset();
            Ok(())
        })
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        let Some(entry) = self.window.as_mut() else { return; };
        entry.with_gpu_mut(|gpu| gpu.resize(size));
        entry.with_window(|w| w.request_redraw());
        self.app.on_resize(size.width, size.height);
    }

    fn redraw(&mut self) -> AppControl {
        let Some(entry) = self.window.as_mut() else {
            return AppControl::Exit;
        };
        let app = &mut self.app;

        entry.with_mut(|fields| {
            let ft: FrameTime = fields.clock.tick();

            // Scope to ensure `ctx` is dropped before mutating frame state.
            let control = {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        window: fields.window,
                    },
                    gpu: fields.gpu,
                    input: fields.input_state,
                    input_frame: fields.input_frame,
                    time: ft,
                };
                app.on_frame(&mut ctx)
            };

            // Clear per-frame deltas after the frame is consumed.
            fields.input_frame.clear();
            control
        })
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        let mut entry = match self.create_window_entry(event_loop) {
            Ok(entry) => entry,
            Err(err) => return self.fail(event_loop, err),
        };

        if let Err(err) = self.start_app(&mut entry) {
            return self.fail(event_loop, err);
        }

        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else { return; };

        entry.with_mut(|fields| {
            if let Some(ev) = translate_input_event(fields.window, fields.input_state, &event) {
                fields.input_state.apply_event(fields.input_frame, ev);
            }
        });

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.exit_requested = true;
            }

            WindowEvent::Resized(new_size) => self.resize(*new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                self.resize(new_size);
            }

            WindowEvent::RedrawRequested => {
                if self.redraw() == AppControl::Exit {
                    self.exit_requested = true;
                }
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
