use crate::coords::Viewport;
use crate::device::{RenderTargets, DEPTH_FORMAT};
use crate::paint::Color;

/// Renderer-facing context (device/queue + surface format + viewport).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub viewport: Viewport, // logical px
    pub scale_factor: f32,
    /// Sample count of the color/depth attachments the 3D pass renders into.
    pub sample_count: u32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
        scale_factor: f32,
        sample_count: u32,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
            scale_factor,
            sample_count,
        }
    }

    #[inline]
    pub fn depth_format(&self) -> wgpu::TextureFormat {
        DEPTH_FORMAT
    }
}

/// Target for drawing: encoder, the surface view and the size-dependent
/// depth/multisample attachments.
///
/// With multisampling on, 3D passes draw into the multisample texture and
/// resolve into the surface view; overlays draw on the resolved surface.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    targets: &'a RenderTargets,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        targets: &'a RenderTargets,
    ) -> Self {
        Self {
            encoder,
            color_view,
            targets,
        }
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.targets.sample_count()
    }

    /// Color attachment for a 3D pass. Resolves into the surface when
    /// multisampling is on.
    pub fn scene_color_attachment(
        &self,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPassColorAttachment<'a> {
        let (view, resolve_target) = match self.targets.msaa_view() {
            Some(msaa) => (msaa, Some(self.color_view)),
            None => (self.color_view, None),
        };
        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }

    pub fn depth_attachment(
        &self,
        load: wgpu::LoadOp<f32>,
    ) -> wgpu::RenderPassDepthStencilAttachment<'a> {
        wgpu::RenderPassDepthStencilAttachment {
            view: self.targets.depth_view(),
            depth_ops: Some(wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }

    /// Single-sampled attachment on the surface view, preserving its contents.
    pub fn overlay_color_attachment(&self) -> wgpu::RenderPassColorAttachment<'a> {
        wgpu::RenderPassColorAttachment {
            view: self.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }

    /// Clears color and depth.
    pub fn clear(&mut self, color: Color) {
        let color_attachment = self.scene_color_attachment(wgpu::LoadOp::Clear(color.to_wgpu()));
        let depth_attachment = self.depth_attachment(wgpu::LoadOp::Clear(1.0));

        let _rpass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lantern clear"),
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment: Some(depth_attachment),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
}
