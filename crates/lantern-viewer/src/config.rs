use std::path::PathBuf;

use clap::Parser;
use lantern_engine::device::GpuInit;
use lantern_engine::window::RuntimeConfig;

/// Renders a model on a 3x3 grid with an orbit camera and a profiler overlay.
///
/// Controls: left drag orbits, right drag or the wheel zooms, `z`/`x` zoom
/// in/out, `m`/`n` toggle multisampling, `k` resets the profiler, `p` prints
/// the profiler report, `Escape` quits.
#[derive(Debug, Clone, Parser)]
#[command(name = "lantern-viewer", version, about)]
pub struct Args {
    /// Model to load: `.gltf`, `.glb` or `.obj` (with its `.mtl`). Collada
    /// (`.dae`) is not supported.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/models/cube.obj"))]
    pub model: PathBuf,

    /// WGSL program with one vertex and one fragment entry point.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/dirlightdiffambpix.wgsl"))]
    pub shader: PathBuf,

    /// Font for the overlay. The overlay is disabled when it cannot be loaded.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSansMono.ttf"))]
    pub font: PathBuf,

    /// Overlay font size in pixels.
    #[arg(long, default_value_t = 14.0)]
    pub font_size: f32,

    #[arg(long, default_value_t = 640)]
    pub width: u32,

    #[arg(long, default_value_t = 360)]
    pub height: u32,

    #[arg(long, default_value = "Lantern - Model Viewer")]
    pub title: String,

    /// Sample count while multisampling is on (`1` disables it).
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=16))]
    pub samples: u32,

    /// Present without waiting for vertical sync, when the surface allows it.
    #[arg(long)]
    pub no_vsync: bool,
}

impl Args {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new(self.title.clone(), self.width as f64, self.height as f64)
    }

    pub fn gpu_init(&self) -> GpuInit {
        GpuInit {
            present_mode: if self.no_vsync {
                wgpu::PresentMode::AutoNoVsync
            } else {
                wgpu::PresentMode::Fifo
            },
            sample_count: self.samples,
            ..GpuInit::default()
        }
    }
}
