use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::math::DrawMatrices;
use crate::model::{Material, Model, TextureData, Vertex};
use crate::render::{RenderCtx, RenderTarget};
use crate::shader::{BindingDecl, ShaderError, ShaderProgram};

use super::common;

/// Resource slots a model shader is expected to declare, as `(group, binding)`.
///
/// - `(0, 0)` `Matrices` uniform, dynamic offset per draw
/// - `(1, 0)` `Material` uniform
/// - `(1, 1)` diffuse texture
/// - `(1, 2)` sampler
pub const MODEL_BINDINGS: [(u32, u32); 4] = [(0, 0), (1, 0), (1, 1), (1, 2)];

/// Slots of [`MODEL_BINDINGS`] the program does not declare.
pub fn missing_bindings(decls: &[BindingDecl]) -> Vec<(u32, u32)> {
    MODEL_BINDINGS
        .iter()
        .copied()
        .filter(|&(g, b)| !decls.iter().any(|d| d.group == g && d.binding == b))
        .collect()
}

/// Model geometry and materials uploaded to the GPU.
pub struct GpuModel {
    meshes: Vec<GpuMesh>,
    materials: Vec<wgpu::BindGroup>,
}

struct GpuMesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

impl GpuModel {
    /// Triangles submitted by one draw of the whole model.
    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(|m| m.index_count / 3).sum()
    }
}

/// Draws [`GpuModel`]s with a user-supplied WGSL program.
///
/// Depth-tested and back-face-culled. Pipelines are keyed by
/// `(surface format, sample count)`; the ones for the startup sample count
/// and for single sampling are built and validated by [`ModelRenderer::new`].
pub struct ModelRenderer {
    label: String,
    module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,

    matrices_bgl: wgpu::BindGroupLayout,
    material_bgl: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(wgpu::TextureFormat, u32), wgpu::RenderPipeline>,

    sampler: wgpu::Sampler,
    white_view: wgpu::TextureView,

    // per-draw matrices, one aligned slot per draw
    matrices_ubo: Option<wgpu::Buffer>,
    matrices_bind_group: Option<wgpu::BindGroup>,
    matrices_capacity: usize,
    matrices_stride: u64,
    staging: Vec<u8>,

    /// Direction towards the light, in view space.
    light_dir: Vec3,
}

impl ModelRenderer {
    /// Compiles `program` and builds its pipelines.
    ///
    /// Compiler errors and pipeline validation errors are returned.
    pub fn new(ctx: &RenderCtx<'_>, program: &ShaderProgram) -> Result<Self, ShaderError> {
        let missing = missing_bindings(program.bindings());
        if !missing.is_empty() {
            log::warn!(
                "{}: no declaration for (group, binding) {missing:?}; pipeline creation may fail",
                program.name()
            );
        }

        let module = program.create_module(ctx.device)?;

        let matrices_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lantern matrices bgl"),
            entries: &[common::uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                MATRICES_SIZE,
                true,
            )],
        });

        let material_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lantern material bgl"),
            entries: &[
                common::uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    std::mem::size_of::<MaterialUniform>() as u64,
                    false,
                ),
                common::texture_entry(1),
                common::sampler_entry(2),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lantern model pipeline layout"),
            bind_group_layouts: &[&matrices_bgl, &material_bgl],
            immediate_size: 0,
        });

        let sampler =
            common::linear_sampler(ctx.device, "lantern model sampler", wgpu::AddressMode::Repeat);

        let white = TextureData {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        };
        let white_view = upload_texture(ctx, &white, "lantern white texture");

        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment as u64;

        let mut renderer = Self {
            label: program.name().to_string(),
            module,
            vertex_entry: program.vertex_entry().to_string(),
            fragment_entry: program.fragment_entry().to_string(),
            matrices_bgl,
            material_bgl,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
            white_view,
            matrices_ubo: None,
            matrices_bind_group: None,
            matrices_capacity: 0,
            matrices_stride: common::align_up(MATRICES_SIZE, alignment),
            staging: Vec::new(),
            light_dir: Vec3::new(1.0, 1.0, 1.0).normalize(),
        };

        // Validation errors from these builds are returned, not raised.
        let scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        for samples in startup_sample_counts(ctx.sample_count) {
            renderer.ensure_pipeline(ctx, (ctx.surface_format, samples));
        }
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::Pipeline {
                name: program.name().to_string(),
                log: err.to_string(),
            });
        }

        Ok(renderer)
    }

    /// Uploads meshes and materials. Materials without a texture bind a
    /// 1 × 1 white texture.
    pub fn upload(&self, ctx: &RenderCtx<'_>, model: &Model) -> GpuModel {
        let materials = model
            .materials
            .iter()
            .map(|m| self.upload_material(ctx, m))
            .collect::<Vec<_>>();

        let meshes = model
            .meshes
            .iter()
            .filter(|m| !m.indices.is_empty())
            .map(|m| GpuMesh {
                vbo: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(format!("lantern mesh vbo {}", m.name).as_str()),
                    contents: bytemuck::cast_slice(&m.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                ibo: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(format!("lantern mesh ibo {}", m.name).as_str()),
                    contents: bytemuck::cast_slice(&m.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: m.indices.len() as u32,
                material: m.material.min(materials.len().saturating_sub(1)),
            })
            .collect();

        GpuModel { meshes, materials }
    }

    /// Draws `model` once per entry in `draws` into the scene attachments,
    /// preserving what is already there. Returns the number of triangles
    /// submitted.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        model: &GpuModel,
        draws: &[DrawMatrices],
    ) -> u32 {
        if draws.is_empty() || model.meshes.is_empty() || model.materials.is_empty() {
            return 0;
        }

        let key = (ctx.surface_format, target.sample_count());
        self.ensure_pipeline(ctx, key);
        self.ensure_matrices_capacity(ctx, draws.len());
        self.write_matrices(ctx, draws);

        let Some(pipeline) = self.pipelines.get(&key) else { return 0; };
        let Some(matrices_bg) = self.matrices_bind_group.as_ref() else { return 0; };

        let color_attachment = target.scene_color_attachment(wgpu::LoadOp::Load);
        let depth_attachment = target.depth_attachment(wgpu::LoadOp::Load);
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lantern model pass"),
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment: Some(depth_attachment),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);

        let mut triangles = 0;
        for i in 0..draws.len() {
            let offset = (i as u64 * self.matrices_stride) as u32;
            rpass.set_bind_group(0, matrices_bg, &[offset]);

            for mesh in &model.meshes {
                rpass.set_bind_group(1, &model.materials[mesh.material], &[]);
                rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
                rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                triangles += mesh.index_count / 3;
            }
        }

        triangles
    }

    fn upload_material(&self, ctx: &RenderCtx<'_>, material: &Material) -> wgpu::BindGroup {
        let uniform = MaterialUniform::from_material(material);
        let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(format!("lantern material ubo {}", material.name).as_str()),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let texture_view = material
            .texture
            .as_ref()
            .map(|t| upload_texture(ctx, t, &material.name));
        let view = texture_view.as_ref().unwrap_or(&self.white_view);

        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(format!("lantern material bind group {}", material.name).as_str()),
            layout: &self.material_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    // ── pipelines and per-draw buffers ─────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, key: (wgpu::TextureFormat, u32)) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let (format, sample_count) = key;
        log::debug!("{}: building pipeline for {format:?} x{sample_count}", self.label);

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label.as_str()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some(self.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some(self.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format(),
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        self.pipelines.insert(key, pipeline);
    }

    fn ensure_matrices_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.matrices_capacity && self.matrices_ubo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(16);
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lantern matrices ubo"),
            size: new_cap as u64 * self.matrices_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lantern matrices bind group"),
            layout: &self.matrices_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: wgpu::BufferSize::new(MATRICES_SIZE),
                }),
            }],
        });

        self.matrices_ubo = Some(ubo);
        self.matrices_bind_group = Some(bind_group);
        self.matrices_capacity = new_cap;
    }

    fn write_matrices(&mut self, ctx: &RenderCtx<'_>, draws: &[DrawMatrices]) {
        let Some(ubo) = self.matrices_ubo.as_ref() else { return; };

        let stride = self.matrices_stride as usize;
        self.staging.clear();
        self.staging.resize(stride * draws.len(), 0);
        for (slot, m) in self.staging.chunks_exact_mut(stride).zip(draws) {
            let uniform = MatricesUniform::new(m, self.light_dir);
            slot[..MATRICES_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        ctx.queue.write_buffer(ubo, 0, &self.staging);
    }
}

/// Sample counts whose pipelines are built at startup: the configured one and
/// single sampling for when multisampling is switched off.
fn startup_sample_counts(configured: u32) -> Vec<u32> {
    if configured > 1 { vec![configured, 1] } else { vec![1] }
}

fn upload_texture(ctx: &RenderCtx<'_>, data: &TextureData, label: &str) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture_with_data(
        ctx.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data.rgba,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2  // uv
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

const MATRICES_SIZE: u64 = std::mem::size_of::<MatricesUniform>() as u64;

/// `Matrices` block (192 bytes). `normal` is a WGSL `mat3x3<f32>`, whose
/// columns are padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MatricesUniform {
    proj_view_model: [[f32; 4]; 4],
    view_model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    light_dir: [f32; 4],
}

impl MatricesUniform {
    fn new(m: &DrawMatrices, light_dir: Vec3) -> Self {
        Self {
            proj_view_model: m.proj_view_model.to_cols_array_2d(),
            view_model: m.view_model.to_cols_array_2d(),
            normal: [
                m.normal.x_axis.extend(0.0).to_array(),
                m.normal.y_axis.extend(0.0).to_array(),
                m.normal.z_axis.extend(0.0).to_array(),
            ],
            light_dir: light_dir.extend(0.0).to_array(),
        }
    }
}

/// `Material` block (80 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MaterialUniform {
    diffuse: [f32; 4],
    ambient: [f32; 4],
    specular: [f32; 4],
    emissive: [f32; 4],
    shininess: f32,
    tex_count: u32,
    _pad: [f32; 2],
}

impl MaterialUniform {
    fn from_material(m: &Material) -> Self {
        Self {
            diffuse: m.diffuse,
            ambient: m.ambient,
            specular: m.specular,
            emissive: m.emissive,
            shininess: m.shininess,
            tex_count: m.texture.is_some() as u32,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Mat4};

    #[test]
    fn uniform_sizes_match_wgsl_layout() {
        assert_eq!(MATRICES_SIZE, 192);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 80);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn matrices_uniform_pads_normal_columns() {
        let m = DrawMatrices {
            proj_view_model: Mat4::IDENTITY,
            view_model: Mat4::IDENTITY,
            normal: Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0),
        };
        let u = MatricesUniform::new(&m, Vec3::Y);
        assert_eq!(u.normal[1], [0.0, 2.0, 0.0, 0.0]);
        assert_eq!(u.normal[2], [0.0, 0.0, 3.0, 0.0]);
        assert_eq!(u.light_dir, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn material_uniform_flags_textures() {
        let mut m = Material::default();
        assert_eq!(MaterialUniform::from_material(&m).tex_count, 0);
        m.texture = Some(TextureData { width: 1, height: 1, rgba: vec![0; 4] });
        let u = MaterialUniform::from_material(&m);
        assert_eq!(u.tex_count, 1);
        assert_eq!(u.diffuse, m.diffuse);
    }

    #[test]
    fn missing_bindings_reports_absent_slots() {
        let decls = vec![
            BindingDecl { group: 0, binding: 0, name: "matrices".into(), ty: "Matrices".into() },
            BindingDecl { group: 1, binding: 1, name: "tex".into(), ty: "texture_2d<f32>".into() },
        ];
        assert_eq!(missing_bindings(&decls), vec![(1, 0), (1, 2)]);
    }

    #[test]
    fn startup_builds_multisampled_and_single_sampled() {
        assert_eq!(startup_sample_counts(4), vec![4, 1]);
        assert_eq!(startup_sample_counts(1), vec![1]);
    }

    #[test]
    fn missing_bindings_empty_when_complete() {
        let decls: Vec<BindingDecl> = MODEL_BINDINGS
            .iter()
            .map(|&(group, binding)| BindingDecl {
                group,
                binding,
                name: String::new(),
                ty: String::new(),
            })
            .collect();
        assert!(missing_bindings(&decls).is_empty());
    }
}
