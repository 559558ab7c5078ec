use std::fmt::Write as _;

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface;
use super::targets::{RenderTargets, DEPTH_FORMAT};
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Owns wgpu core objects, the surface configuration and the attachments
/// that follow the surface size.
///
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - keeps depth and multisample targets in sync with the surface size
/// - acquires frames and provides an encoder + view for rendering
pub struct Gpu<'w> {
    // Kept alive for the surface's lifetime.
    _instance: wgpu::Instance,

    /// Surface bound to the window.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    targets: RenderTargets,

    /// Sample count used while multisampling is on.
    msaa_samples: u32,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            sample_count,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lantern device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;

        let msaa_samples = sample_count.max(1);
        for f in [format, DEPTH_FORMAT] {
            let flags = adapter.get_texture_format_features(f).flags;
            anyhow::ensure!(
                flags.sample_count_supported(msaa_samples),
                "{msaa_samples}x multisampling is not supported for {f:?} on this adapter"
            );
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface::choose_present_mode(&surface_caps, present_mode),
            alpha_mode: surface::choose_alpha_mode(&surface_caps, alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let targets = RenderTargets::new(&device, format, config.width, config.height, msaa_samples);

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            targets,
            msaa_samples,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Sample count of the current attachments (1 when multisampling is off).
    pub fn sample_count(&self) -> u32 {
        self.targets.sample_count()
    }

    /// Turns multisampling on or off, rebuilding the attachments when the
    /// effective sample count changes.
    pub fn set_msaa(&mut self, enabled: bool) {
        let wanted = if enabled { self.msaa_samples } else { 1 };
        if wanted != self.targets.sample_count() {
            log::info!("multisampling: {wanted}x");
            self.rebuild_targets(wanted);
        }
    }

    /// Reconfigures the surface and attachments after a resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let configured = surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
        if configured {
            self.rebuild_targets(self.targets.sample_count());
        }
    }

    fn rebuild_targets(&mut self, sample_count: u32) {
        self.targets = RenderTargets::new(
            &self.device,
            self.config.format,
            self.config.width,
            self.config.height,
            sample_count,
        );
    }

    /// Acquires the next surface texture and creates an encoder.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lantern frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands and presents the surface texture.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        frame.surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }

    /// Adapter, backend and limit summary for the startup log.
    pub fn adapter_report(&self) -> String {
        let info = self.adapter.get_info();
        let limits = self.device.limits();

        let mut out = String::new();
        let _ = writeln!(out, "Adapter: {} ({:?})", info.name, info.device_type);
        let _ = writeln!(out, "  backend: {:?}", info.backend);
        let _ = writeln!(out, "  driver: {} {}", info.driver, info.driver_info);
        let _ = writeln!(out, "  surface format: {:?}", self.config.format);
        let _ = writeln!(out, "  present mode: {:?}", self.config.present_mode);
        let _ = writeln!(out, "  msaa samples: {}", self.msaa_samples);
        let _ = writeln!(out, "  max texture 2d: {}", limits.max_texture_dimension_2d);
        let _ = write!(
            out,
            "  max uniform binding: {} (offset alignment {})",
            limits.max_uniform_buffer_binding_size, limits.min_uniform_buffer_offset_alignment
        );
        out
    }
}
