use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use fontdue::layout::GlyphRasterConfig;

use crate::render::{RenderCtx, RenderTarget};
use crate::text::{FontStyle, FontSystem, PlacedGlyph, SentenceId, Sentences, TextLayout};

use super::common::{self, QuadBuffers, QuadVertex, ViewportUniform};

const ATLAS_SIZE: u32 = 2048;
const GLYPH_PADDING: u32 = 1;
const INITIAL_INSTANCES: usize = 256;

/// 2D text drawn over the 3D scene.
///
/// Text is organised in sentences: allocate one with [`gen_sentence`],
/// set its text with [`prepare_sentence`], queue it each frame with
/// [`render_sentence`] and draw everything queued with [`render`].
///
/// Every sentence shares the overlay's [`FontStyle`]. Glyphs are rasterized
/// by fontdue the first time they are drawn and cached in an R8 atlas.
///
/// [`gen_sentence`]: Self::gen_sentence
/// [`prepare_sentence`]: Self::prepare_sentence
/// [`render_sentence`]: Self::render_sentence
/// [`render`]: Self::render
pub struct TextOverlay {
    style: FontStyle,
    sentences: Sentences,
    layout: TextLayout,
    placed: Vec<PlacedGlyph>,
    instances: Vec<GlyphInstance>,

    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,
    quad: QuadBuffers,
    atlas: GlyphAtlas,
    instance_vbo: wgpu::Buffer,
    instance_capacity: usize,
}

impl TextOverlay {
    /// Creates the overlay for `ctx`'s surface format. The overlay draws on
    /// the resolved surface, so it is always single-sampled.
    pub fn new(ctx: &RenderCtx<'_>, style: FontStyle) -> Self {
        let device = ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lantern text shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lantern text bgl"),
            entries: &[
                common::uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX,
                    std::mem::size_of::<ViewportUniform>() as u64,
                    false,
                ),
                common::texture_entry(1),
                common::sampler_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lantern text pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lantern text pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), GlyphInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(common::premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let atlas = GlyphAtlas::new(device);
        let sampler =
            common::linear_sampler(device, "lantern glyph sampler", wgpu::AddressMode::ClampToEdge);
        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lantern text viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lantern text bind group"),
            layout: &bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            style,
            sentences: Sentences::new(),
            layout: TextLayout::default(),
            placed: Vec::new(),
            instances: Vec::new(),
            pipeline,
            bind_group,
            viewport_ubo,
            quad: QuadBuffers::new(device, "lantern text"),
            atlas,
            instance_vbo: instance_buffer(device, INITIAL_INSTANCES),
            instance_capacity: INITIAL_INSTANCES,
        }
    }

    pub fn gen_sentence(&mut self) -> SentenceId {
        self.sentences.create()
    }

    pub fn prepare_sentence(&mut self, id: SentenceId, text: &str) -> bool {
        self.sentences.prepare(id, text)
    }

    pub fn delete_sentence(&mut self, id: SentenceId) -> bool {
        self.sentences.delete(id)
    }

    /// Queues sentence `id` for this frame, top-left at `(x, y)` in logical pixels.
    pub fn render_sentence(&mut self, x: f32, y: f32, id: SentenceId) {
        self.sentences.queue(x, y, id);
    }

    /// Draws every sentence queued since the last call on top of the surface.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, fonts: &FontSystem) {
        let queued = self.sentences.take_queued();
        if queued.is_empty() {
            return;
        }
        let Some(font) = fonts.get(self.style.font) else { return; };

        self.placed.clear();
        for q in &queued {
            if let Some(text) = self.sentences.text(q.id) {
                self.layout.layout(fonts, &self.style, q.x, q.y, text, &mut self.placed);
            }
        }

        let color = self.style.color.premultiplied();
        self.instances.clear();
        for g in &self.placed {
            if let Some(rect) = self.atlas.rect(ctx.queue, font, g.key) {
                self.instances.push(GlyphInstance::new(g, rect, color));
            }
        }
        if self.instances.is_empty() {
            return;
        }

        if self.instances.len() > self.instance_capacity {
            self.instance_capacity = self.instances.len().next_power_of_two();
            self.instance_vbo = instance_buffer(ctx.device, self.instance_capacity);
        }
        ctx.queue.write_buffer(&self.instance_vbo, 0, bytemuck::cast_slice(&self.instances));
        ctx.queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform::new(ctx.viewport)),
        );

        let color_attachment = target.overlay_color_attachment();
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lantern text pass"),
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(1, self.instance_vbo.slice(..));
        self.quad.draw_instances(&mut rpass, self.instances.len() as u32);
    }
}

fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lantern text instance vbo"),
        size: (capacity * std::mem::size_of::<GlyphInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

// ── glyph atlas ───────────────────────────────────────────────────────────

/// Normalized atlas coordinates of one glyph bitmap.
#[derive(Debug, Copy, Clone, PartialEq)]
struct AtlasRect {
    uv_min: [f32; 2],
    uv_max: [f32; 2],
}

impl AtlasRect {
    fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        let size = ATLAS_SIZE as f32;
        Self {
            uv_min: [x as f32 / size, y as f32 / size],
            uv_max: [(x + w) as f32 / size, (y + h) as f32 / size],
        }
    }
}

/// R8 coverage atlas filled shelf by shelf. Glyphs stay for the atlas'
/// lifetime; once it is full new glyphs are dropped.
struct GlyphAtlas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    cursor: (u32, u32, u32),
    full: bool,
    rects: HashMap<GlyphRasterConfig, AtlasRect>,
}

impl GlyphAtlas {
    fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lantern glyph atlas"),
            size: wgpu::Extent3d {
                width: ATLAS_SIZE,
                height: ATLAS_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            cursor: (GLYPH_PADDING, GLYPH_PADDING, 0),
            full: false,
            rects: HashMap::new(),
        }
    }

    /// Atlas rectangle of `key`, rasterizing and uploading it on first use.
    /// `None` for empty glyphs and once the atlas is full.
    fn rect(
        &mut self,
        queue: &wgpu::Queue,
        font: &fontdue::Font,
        key: GlyphRasterConfig,
    ) -> Option<AtlasRect> {
        if let Some(rect) = self.rects.get(&key) {
            return Some(*rect);
        }
        if self.full {
            return None;
        }

        let (metrics, bitmap) = font.rasterize_config(key);
        let (w, h) = (metrics.width as u32, metrics.height as u32);
        if w == 0 || h == 0 {
            return None;
        }

        let Some(slot) = shelf_place(self.cursor, w, h) else {
            log::warn!("glyph atlas is full ({ATLAS_SIZE}x{ATLAS_SIZE}); new glyphs are dropped");
            self.full = true;
            return None;
        };
        self.cursor = (slot.x + w + GLYPH_PADDING, slot.y, slot.row_height);

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: slot.x, y: slot.y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );

        let rect = AtlasRect::new(slot.x, slot.y, w, h);
        self.rects.insert(key, rect);
        Some(rect)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct ShelfSlot {
    x: u32,
    y: u32,
    row_height: u32,
}

/// Finds the slot for a `w × h` glyph given the cursor `(x, y, row_height)`.
///
/// Starts a new shelf row when the glyph does not fit horizontally; returns
/// `None` when the atlas has no vertical room left.
fn shelf_place(cursor: (u32, u32, u32), w: u32, h: u32) -> Option<ShelfSlot> {
    let (mut x, mut y, mut row_height) = cursor;

    if x + w + GLYPH_PADDING > ATLAS_SIZE {
        y += row_height + GLYPH_PADDING;
        x = GLYPH_PADDING;
        row_height = 0;
    }

    if y + h + GLYPH_PADDING > ATLAS_SIZE {
        return None;
    }

    Some(ShelfSlot {
        x,
        y,
        row_height: row_height.max(h),
    })
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// One glyph quad (48 bytes). `color` is premultiplied.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct GlyphInstance {
    dst_min: [f32; 2],
    dst_max: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
    color: [f32; 4],
}

impl GlyphInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2,
        2 => Float32x2,
        3 => Float32x2,
        4 => Float32x2,
        5 => Float32x4
    ];

    fn new(glyph: &PlacedGlyph, rect: AtlasRect, color: [f32; 4]) -> Self {
        Self {
            dst_min: [glyph.x, glyph.y],
            dst_max: [glyph.x + glyph.width as f32, glyph.y + glyph.height as f32],
            uv_min: rect.uv_min,
            uv_max: rect.uv_max,
            color,
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GlyphInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_instance_is_48_bytes() {
        assert_eq!(std::mem::size_of::<GlyphInstance>(), 48);
    }

    #[test]
    fn shelf_places_on_current_row() {
        let slot = shelf_place((1, 1, 0), 10, 12).unwrap();
        assert_eq!(slot, ShelfSlot { x: 1, y: 1, row_height: 12 });

        let slot = shelf_place((12, 1, 12), 10, 8).unwrap();
        assert_eq!(slot, ShelfSlot { x: 12, y: 1, row_height: 12 });
    }

    #[test]
    fn shelf_wraps_to_next_row() {
        let slot = shelf_place((ATLAS_SIZE - 5, 1, 20), 10, 12).unwrap();
        assert_eq!(slot, ShelfSlot { x: GLYPH_PADDING, y: 22, row_height: 12 });
    }

    #[test]
    fn shelf_reports_full_atlas() {
        assert!(shelf_place((1, ATLAS_SIZE - 10, 0), 10, 12).is_none());
    }

    #[test]
    fn atlas_rect_is_normalized() {
        let r = AtlasRect::new(0, 1024, 512, 1024);
        assert_eq!(r.uv_min, [0.0, 0.5]);
        assert_eq!(r.uv_max, [0.25, 1.0]);
    }

    #[test]
    fn glyph_instance_spans_the_bitmap() {
        let glyph = PlacedGlyph {
            key: GlyphRasterConfig { glyph_index: 5, px: 14.0, font_hash: 0 },
            x: 10.0,
            y: 12.0,
            width: 7,
            height: 9,
        };
        let rect = AtlasRect::new(1, 1, 7, 9);
        let inst = GlyphInstance::new(&glyph, rect, [0.5, 0.25, 0.125, 0.5]);
        assert_eq!(inst.dst_min, [10.0, 12.0]);
        assert_eq!(inst.dst_max, [17.0, 21.0]);
        assert_eq!(inst.uv_min, rect.uv_min);
        assert_eq!(inst.color, [0.5, 0.25, 0.125, 0.5]);
    }
}
