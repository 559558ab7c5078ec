use std::rc::Rc;

use glam::{Mat4, Vec3};
use lantern_engine::camera::{OrbitCamera, Tracking};
use lantern_engine::coords::Viewport;
use lantern_engine::core::{App, AppControl, FrameCtx};
use lantern_engine::input::{InputEvent, Key, KeyState, MouseButtonState};
use lantern_engine::math::{DrawMatrices, MatrixKind, MatrixStack, StackUnderflow};
use lantern_engine::model::Model;
use lantern_engine::paint::Color;
use lantern_engine::profile::Profiler;
use lantern_engine::render::{GpuModel, ModelRenderer, RenderCtx, RenderTarget, TextOverlay};
use lantern_engine::shader::ShaderProgram;
use lantern_engine::text::{FontId, FontStyle, FontSystem, SentenceId};
use lantern_engine::time::FpsCounter;

const FOV_Y_DEGREES: f32 = 53.13;
const NEAR: f32 = 0.1;
const FAR: f32 = 10_000.0;

/// Grid positions along X and Z.
const GRID: [f32; 3] = [-2.0, 0.0, 2.0];

/// Runtime requests that need the GPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Command {
    Exit,
    SetMsaa(bool),
}

/// FPS line and profiler report drawn over the scene.
struct Hud {
    overlay: TextOverlay,
    fps: SentenceId,
    dump: SentenceId,
}

impl Hud {
    fn new(ctx: &RenderCtx<'_>, font: FontId, size: f32) -> Self {
        let style = FontStyle::new(font).with_size(size).with_fixed(true);
        let mut overlay = TextOverlay::new(ctx, style);
        let fps = overlay.gen_sentence();
        let dump = overlay.gen_sentence();
        Self { overlay, fps, dump }
    }
}

/// The model viewer.
pub struct Viewer {
    program: ShaderProgram,
    model: Model,
    model_transform: Mat4,

    renderer: Option<ModelRenderer>,
    gpu_model: Option<GpuModel>,

    fonts: FontSystem,
    font: Option<FontId>,
    font_size: f32,
    hud: Option<Hud>,

    camera: OrbitCamera,
    matrices: MatrixStack,
    profiler: Rc<Profiler>,
    fps: FpsCounter,

    /// Triangles submitted during the current frame.
    primitives: u32,
    /// Triangle count published when the frame's statistics are collected.
    reported_primitives: u32,
}

impl Viewer {
    /// `font` is `None` when no font could be loaded; the FPS line then only
    /// goes to the window title.
    pub fn new(
        program: ShaderProgram,
        model: Model,
        fonts: FontSystem,
        font: Option<FontId>,
        font_size: f32,
    ) -> Self {
        let model_transform = model.unit_transform();
        Self {
            program,
            model,
            model_transform,
            renderer: None,
            gpu_model: None,
            fonts,
            font,
            font_size,
            hud: None,
            camera: OrbitCamera::default(),
            matrices: MatrixStack::new(),
            profiler: Rc::new(Profiler::new()),
            fps: FpsCounter::new(),
            primitives: 0,
            reported_primitives: 0,
        }
    }

    fn handle_input(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        for ev in &ctx.input_frame.events {
            match handle_event(&mut self.camera, &self.profiler, ev) {
                Some(Command::Exit) => return AppControl::Exit,
                Some(Command::SetMsaa(on)) => ctx.gpu.set_msaa(on),
                None => {}
            }
        }
        AppControl::Continue
    }

    fn draw(&mut self, ctx: &mut FrameCtx<'_, '_>, profiler: &Profiler) -> AppControl {
        let mut frame = match ctx.begin_frame(Color::WHITE) {
            Ok(frame) => frame,
            Err(control) => return control,
        };

        self.matrices.load_identity(MatrixKind::View);
        self.matrices.load_identity(MatrixKind::Model);
        self.matrices.look_at(self.camera.eye(), Vec3::ZERO, Vec3::Y);

        {
            let _s = profiler.scope("Render models");
            match grid_draws(&mut self.matrices, self.model_transform) {
                Ok(draws) => {
                    if let (Some(renderer), Some(model)) =
                        (self.renderer.as_mut(), self.gpu_model.as_ref())
                    {
                        let rctx = ctx.render_ctx();
                        let mut target =
                            RenderTarget::new(&mut frame.encoder, &frame.view, ctx.gpu.targets());
                        self.primitives = renderer.render(&rctx, &mut target, model, &draws);
                    }
                }
                Err(err) => log::error!("{err}"),
            }
        }

        if let Some(sample) = self.fps.frame(ctx.time.elapsed) {
            let line = fps_line(sample.fps, self.reported_primitives);
            ctx.window.set_title(&line);
            if let Some(hud) = self.hud.as_mut() {
                hud.overlay.prepare_sentence(hud.fps, &line);
            }
        }

        {
            let _s = profiler.scope("Dump");
            if let Some(hud) = self.hud.as_mut() {
                hud.overlay.prepare_sentence(hud.dump, &profiler.dump_levels());
                hud.overlay.render_sentence(10.0, 10.0, hud.fps);
                hud.overlay.render_sentence(10.0, 30.0, hud.dump);

                let rctx = ctx.render_ctx();
                let mut target =
                    RenderTarget::new(&mut frame.encoder, &frame.view, ctx.gpu.targets());
                hud.overlay.render(&rctx, &mut target, &self.fonts);
            }
        }

        {
            let _s = profiler.scope("Swap");
            ctx.present(frame);
        }

        AppControl::Continue
    }
}

impl App for Viewer {
    fn on_start(&mut self, ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        let renderer = ModelRenderer::new(ctx, &self.program)?;
        let gpu_model = renderer.upload(ctx, &self.model);
        log::info!(
            "uploaded {} triangles per instance",
            gpu_model.triangle_count()
        );
        self.renderer = Some(renderer);
        self.gpu_model = Some(gpu_model);
        self.hud = self.font.map(|font| Hud::new(ctx, font, self.font_size));
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        let aspect = Viewport::new(width as f32, height as f32).aspect();
        self.matrices.load_identity(MatrixKind::Projection);
        self.matrices.perspective(FOV_Y_DEGREES, aspect, NEAR, FAR);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.handle_input(ctx) == AppControl::Exit {
            return AppControl::Exit;
        }

        let profiler = Rc::clone(&self.profiler);
        let control = {
            let _frame = profiler.scope("Frame");
            self.draw(ctx, &profiler)
        };

        {
            let _s = profiler.scope("Collect GPU Queries Time");
            profiler.collect_query_results();
            self.reported_primitives = self.primitives;
        }

        control
    }
}

/// Applies one input event to the camera/profiler; returns what the runtime
/// has to do about it.
fn handle_event(camera: &mut OrbitCamera, profiler: &Profiler, ev: &InputEvent) -> Option<Command> {
    match ev {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat,
            ..
        } => match key {
            Key::Escape => Some(Command::Exit),
            Key::Z => {
                camera.zoom_by(-OrbitCamera::ZOOM_STEP);
                None
            }
            Key::X => {
                camera.zoom_by(OrbitCamera::ZOOM_STEP);
                None
            }
            _ if *repeat => None,
            Key::M => Some(Command::SetMsaa(true)),
            Key::N => Some(Command::SetMsaa(false)),
            Key::K => {
                profiler.reset();
                None
            }
            Key::P => {
                println!("{}", profiler.dump_levels());
                None
            }
            _ => None,
        },

        InputEvent::PointerButton(b) => {
            match b.state {
                MouseButtonState::Pressed => camera.begin_drag(b.button, b.x, b.y),
                MouseButtonState::Released => camera.end_drag(b.x, b.y),
            }
            None
        }

        InputEvent::PointerMoved(p) => {
            if camera.tracking() != Tracking::None {
                camera.drag_to(p.x, p.y);
            }
            None
        }

        InputEvent::MouseWheel { delta, .. } => {
            camera.zoom_by(delta.lines_y() * OrbitCamera::ZOOM_STEP);
            None
        }

        _ => None,
    }
}

/// Matrices for one model instance per grid cell, leaving the model stack
/// as it was.
fn grid_draws(
    matrices: &mut MatrixStack,
    model_transform: Mat4,
) -> Result<Vec<DrawMatrices>, StackUnderflow> {
    let mut draws = Vec::with_capacity(GRID.len() * GRID.len());
    for x in GRID {
        for z in GRID {
            matrices.push(MatrixKind::Model);
            matrices.translate(MatrixKind::Model, x, 0.0, z);
            matrices.multiply(MatrixKind::Model, model_transform);
            draws.push(matrices.draw_matrices());
            matrices.pop(MatrixKind::Model)?;
        }
    }
    Ok(draws)
}

fn fps_line(fps: f64, primitives: u32) -> String {
    format!("FPS:{fps:4.2}  Counter: {primitives}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_engine::input::{Modifiers, MouseButton, MouseWheelDelta, PointerButtonEvent, PointerMoveEvent};

    fn key(key: Key, repeat: bool) -> InputEvent {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
            repeat,
        }
    }

    fn button(state: MouseButtonState, button: MouseButton, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button,
            state,
            x,
            y,
            modifiers: Modifiers::default(),
        })
    }

    #[test]
    fn escape_exits_and_msaa_keys_toggle() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        assert_eq!(handle_event(&mut cam, &prof, &key(Key::Escape, false)), Some(Command::Exit));
        assert_eq!(handle_event(&mut cam, &prof, &key(Key::M, false)), Some(Command::SetMsaa(true)));
        assert_eq!(handle_event(&mut cam, &prof, &key(Key::N, false)), Some(Command::SetMsaa(false)));
        assert_eq!(handle_event(&mut cam, &prof, &key(Key::M, true)), None);
    }

    #[test]
    fn zoom_keys_repeat() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        handle_event(&mut cam, &prof, &key(Key::Z, false));
        handle_event(&mut cam, &prof, &key(Key::Z, true));
        assert!((cam.distance() - 4.8).abs() < 1e-5);
        handle_event(&mut cam, &prof, &key(Key::X, false));
        assert!((cam.distance() - 4.9).abs() < 1e-5);
    }

    #[test]
    fn k_resets_profiler() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        drop(prof.scope("Frame"));
        prof.collect_query_results();
        assert_eq!(prof.calls("Frame"), Some(1));

        handle_event(&mut cam, &prof, &key(Key::K, false));
        assert_eq!(prof.calls("Frame"), None);
        assert_eq!(prof.frames(), 0);
    }

    #[test]
    fn left_drag_previews_then_commits() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();

        handle_event(&mut cam, &prof, &button(MouseButtonState::Pressed, MouseButton::Left, 100.0, 100.0));
        handle_event(&mut cam, &prof, &InputEvent::PointerMoved(PointerMoveEvent { x: 110.0, y: 100.0 }));
        assert_eq!(cam.alpha(), 0.0);
        assert_ne!(cam.eye(), OrbitCamera::default().eye());

        handle_event(&mut cam, &prof, &button(MouseButtonState::Released, MouseButton::Left, 110.0, 100.0));
        assert_eq!(cam.alpha(), -10.0);
        assert_eq!(cam.tracking(), Tracking::None);
    }

    #[test]
    fn release_outside_the_window_commits_the_last_preview() {
        use lantern_engine::input::{InputFrame, InputState};

        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        let mut feed = |cam: &mut OrbitCamera, state: &mut InputState, ev: InputEvent| {
            handle_event(cam, &prof, &ev);
            state.apply_event(&mut frame, ev);
        };

        feed(&mut cam, &mut state, button(MouseButtonState::Pressed, MouseButton::Left, 300.0, 200.0));
        feed(&mut cam, &mut state, InputEvent::PointerMoved(PointerMoveEvent { x: 310.0, y: 200.0 }));
        let preview = cam.eye();
        feed(&mut cam, &mut state, InputEvent::PointerLeft);

        // The windowing layer stamps releases with the input state's position.
        let (x, y) = state.button_position();
        feed(&mut cam, &mut state, button(MouseButtonState::Released, MouseButton::Left, x, y));

        assert_eq!(cam.alpha(), -10.0);
        assert_eq!(cam.beta(), 0.0);
        assert!(cam.eye().abs_diff_eq(preview, 1e-5));
    }

    #[test]
    fn moves_without_a_drag_leave_the_camera_alone() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        handle_event(&mut cam, &prof, &InputEvent::PointerMoved(PointerMoveEvent { x: 50.0, y: 80.0 }));
        assert_eq!(cam.eye(), OrbitCamera::default().eye());
    }

    #[test]
    fn wheel_zooms_by_notches() {
        let mut cam = OrbitCamera::default();
        let prof = Profiler::new();
        let wheel = InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 2.0 },
            modifiers: Modifiers::default(),
        };
        handle_event(&mut cam, &prof, &wheel);
        assert!((cam.distance() - 5.2).abs() < 1e-5);
    }

    #[test]
    fn grid_has_nine_instances_and_balances_the_stack() {
        let mut m = MatrixStack::new();
        let depth = m.depth();
        let draws = grid_draws(&mut m, Mat4::IDENTITY).unwrap();
        assert_eq!(draws.len(), 9);
        assert_eq!(m.depth(), depth);
        assert_eq!(m.get(MatrixKind::Model), Mat4::IDENTITY);

        // First cell sits at (-2, 0, -2).
        let p = draws[0].view_model.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(-2.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn fps_line_format() {
        assert_eq!(fps_line(59.987, 1200), "FPS:59.99  Counter: 1200");
        assert_eq!(fps_line(5.0, 0), "FPS:5.00  Counter: 0");
    }
}
