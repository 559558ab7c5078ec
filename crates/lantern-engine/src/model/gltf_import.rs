//! glTF 2.0 import (`.gltf` with external buffers, or binary `.glb`).

use std::path::Path;

use glam::{Mat3, Mat4, Vec3};

use super::error::ModelError;
use super::mesh::{Material, Mesh, TextureData, Vertex};

pub(super) fn load(path: &Path) -> Result<(Vec<Mesh>, Vec<Material>), ModelError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| ModelError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let mut materials: Vec<Material> = document
        .materials()
        .map(|m| convert_material(&m, &images))
        .collect();

    // Primitives without a material share one default entry at the end.
    let default_material = materials.len();
    materials.push(Material::default());

    let mut meshes = Vec::new();
    let scenes: Vec<gltf::Scene> = match document.default_scene() {
        Some(scene) => vec![scene],
        None => document.scenes().collect(),
    };
    for scene in scenes {
        for node in scene.nodes() {
            visit_node(&node, Mat4::IDENTITY, &buffers, default_material, &mut meshes);
        }
    }

    Ok((meshes, materials))
}

fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
    meshes: &mut Vec<Mesh>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed").to_string();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("gltf: skipping non-triangle primitive in mesh {name}");
                continue;
            }
            let material = primitive.material().index().unwrap_or(default_material);
            if let Some(m) = read_primitive(&primitive, buffers, world, name.clone(), material) {
                meshes.push(m);
            }
        }
    }

    for child in node.children() {
        visit_node(&child, world, buffers, default_material, meshes);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
    name: String,
    material: usize,
) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|n| n.collect())
        .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|i| i.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let n = normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]);
            Vertex {
                position: world.transform_point3(Vec3::from(*p)).to_array(),
                normal: (normal_matrix * Vec3::from(n)).normalize_or_zero().to_array(),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            }
        })
        .collect();

    Some(Mesh {
        name,
        vertices,
        indices,
        material,
    })
}

fn convert_material(material: &gltf::Material, images: &[gltf::image::Data]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let base = pbr.base_color_factor();
    let [er, eg, eb] = material.emissive_factor();

    let texture = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(to_rgba);

    // Metallic-roughness has no direct Phong equivalent; map roughness to a
    // shininess exponent so glossy materials still get a tight highlight.
    let roughness = pbr.roughness_factor().clamp(0.0, 1.0);

    Material {
        name: material.name().unwrap_or("unnamed").to_string(),
        diffuse: base,
        ambient: [base[0] * 0.2, base[1] * 0.2, base[2] * 0.2, base[3]],
        specular: [1.0 - roughness, 1.0 - roughness, 1.0 - roughness, 1.0],
        emissive: [er, eg, eb, 1.0],
        shininess: (1.0 - roughness) * 128.0,
        texture,
    }
}

fn to_rgba(image: &gltf::image::Data) -> Option<TextureData> {
    use gltf::image::Format;

    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            log::warn!("gltf: unsupported texture format {other:?}; texture ignored");
            return None;
        }
    };

    Some(TextureData {
        width: image.width,
        height: image.height,
        rgba,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    const SCENE: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "translation": [10.0, 0.0, 0.0], "children": [1] },
    { "scale": [2.0, 2.0, 2.0], "mesh": 0 }
  ],
  "meshes": [{
    "name": "tri",
    "primitives": [
      { "attributes": { "POSITION": 0 } },
      { "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2, "material": 0 }
    ]
  }],
  "materials": [{
    "name": "copper",
    "pbrMetallicRoughness": {
      "baseColorFactor": [1.0, 0.5, 0.25, 1.0],
      "baseColorTexture": { "index": 0 },
      "roughnessFactor": 0.5
    }
  }],
  "textures": [{ "source": 0 }],
  "images": [{ "uri": "tex.png" }],
  "buffers": [{ "uri": "tri.bin", "byteLength": 66 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

    fn write_scene(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        let positions = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let uvs = [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0];
        for v in positions.iter().chain(&uvs) {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        assert_eq!(bin.len(), 66);

        std::fs::write(dir.join("tri.bin"), bin).unwrap();
        image::RgbImage::from_raw(1, 1, vec![255, 0, 0])
            .unwrap()
            .save(dir.join("tex.png"))
            .unwrap();

        let path = dir.join("scene.gltf");
        std::fs::write(&path, SCENE).unwrap();
        path
    }

    #[test]
    fn node_transforms_are_baked() {
        let dir = tempfile::tempdir().unwrap();
        let model = Model::load(write_scene(dir.path())).unwrap();

        assert_eq!(model.meshes.len(), 2);
        let tri = &model.meshes[0];
        assert_eq!(tri.vertices[1].position, [12.0, 0.0, 0.0]);
        assert_eq!(tri.vertices[2].position, [10.0, 2.0, 0.0]);
        assert_eq!(tri.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(model.bounds().max, Vec3::new(12.0, 2.0, 0.0));
    }

    #[test]
    fn non_indexed_primitive_gets_sequential_indices_and_default_material() {
        let dir = tempfile::tempdir().unwrap();
        let model = Model::load(write_scene(dir.path())).unwrap();

        assert_eq!(model.materials.len(), 2);
        let tri = &model.meshes[0];
        assert_eq!(tri.indices, vec![0, 1, 2]);
        assert_eq!(tri.material, 1);
        assert_eq!(model.materials[1].name, Material::default().name);
    }

    #[test]
    fn material_maps_base_color_and_texture() {
        let dir = tempfile::tempdir().unwrap();
        let model = Model::load(write_scene(dir.path())).unwrap();

        let textured = &model.meshes[1];
        assert_eq!(textured.material, 0);
        assert_eq!(textured.vertices[2].uv, [0.0, 1.0]);

        let m = &model.materials[0];
        assert_eq!(m.name, "copper");
        assert_eq!(m.diffuse, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(m.shininess, 64.0);
        let tex = m.texture.as_ref().unwrap();
        assert_eq!((tex.width, tex.height), (1, 1));
        assert_eq!(tex.rgba, vec![255, 0, 0, 255]);
    }

    #[test]
    fn missing_file_is_a_gltf_error() {
        let err = Model::load("no/such/scene.gltf").unwrap_err();
        assert!(matches!(err, ModelError::Gltf { .. }));
    }

    #[test]
    fn grey_images_expand_to_rgba() {
        let data = gltf::image::Data {
            pixels: vec![7, 9],
            format: gltf::image::Format::R8,
            width: 2,
            height: 1,
        };
        let tex = to_rgba(&data).unwrap();
        assert_eq!(tex.rgba, vec![7, 7, 7, 255, 9, 9, 9, 255]);
    }

    #[test]
    fn wide_channel_images_are_ignored() {
        let data = gltf::image::Data {
            pixels: vec![0; 6],
            format: gltf::image::Format::R16G16B16,
            width: 1,
            height: 1,
        };
        assert!(to_rgba(&data).is_none());
    }
}
