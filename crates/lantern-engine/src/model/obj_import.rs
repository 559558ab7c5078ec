//! Wavefront OBJ/MTL import.

use std::io::BufRead;
use std::path::Path;

use super::error::ModelError;
use super::mesh::{Material, Mesh, TextureData, Vertex};

pub(super) fn load(path: &Path) -> Result<(Vec<Mesh>, Vec<Material>), ModelError> {
    let (models, materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| ModelError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(convert(models, materials, path, &base_dir))
}

/// Imports OBJ data from a reader; `load_mtl` resolves `mtllib` references.
pub(super) fn load_from_reader<R, F>(
    reader: &mut R,
    name: &Path,
    load_mtl: F,
) -> Result<(Vec<Mesh>, Vec<Material>), ModelError>
where
    R: BufRead,
    F: Fn(&Path) -> tobj::MTLLoadResult,
{
    let (models, materials) = tobj::load_obj_buf(reader, &tobj::GPU_LOAD_OPTIONS, load_mtl)
        .map_err(|source| ModelError::Obj {
            path: name.to_path_buf(),
            source,
        })?;

    Ok(convert(models, materials, name, Path::new("")))
}

fn convert(
    models: Vec<tobj::Model>,
    materials: Result<Vec<tobj::Material>, tobj::LoadError>,
    path: &Path,
    base_dir: &Path,
) -> (Vec<Mesh>, Vec<Material>) {
    let source_materials = materials.unwrap_or_else(|err| {
        log::warn!("{}: material library not loaded ({err}); using defaults", path.display());
        Vec::new()
    });

    let mut materials: Vec<Material> = source_materials
        .iter()
        .map(|m| convert_material(m, base_dir))
        .collect();
    let default_material = materials.len();
    materials.push(Material::default());

    let meshes = models
        .into_iter()
        .filter(|m| !m.mesh.indices.is_empty())
        .map(|model| {
            let mesh = model.mesh;
            let count = mesh.positions.len() / 3;
            let vertices = (0..count)
                .map(|i| Vertex {
                    position: [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    normal: if mesh.normals.len() >= (i + 1) * 3 {
                        [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
                    } else {
                        [0.0, 1.0, 0.0]
                    },
                    // OBJ puts v=0 at the bottom of the image; textures are stored top-down.
                    uv: if mesh.texcoords.len() >= (i + 1) * 2 {
                        [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                    } else {
                        [0.0, 0.0]
                    },
                })
                .collect();

            Mesh {
                name: model.name,
                vertices,
                indices: mesh.indices,
                material: mesh
                    .material_id
                    .filter(|&id| id < default_material)
                    .unwrap_or(default_material),
            }
        })
        .collect();

    (meshes, materials)
}

fn convert_material(m: &tobj::Material, base_dir: &Path) -> Material {
    let alpha = m.dissolve.unwrap_or(1.0);
    let rgba = |c: Option<[f32; 3]>, fallback: [f32; 4]| {
        c.map(|[r, g, b]| [r, g, b, alpha]).unwrap_or(fallback)
    };
    let defaults = Material::default();

    let texture = m
        .diffuse_texture
        .as_deref()
        .filter(|name| !name.is_empty())
        .and_then(|name| match load_texture(&base_dir.join(name)) {
            Ok(tex) => Some(tex),
            Err(err) => {
                log::warn!("{:#}", anyhow::Error::new(err));
                None
            }
        });

    Material {
        name: m.name.clone(),
        diffuse: rgba(m.diffuse, defaults.diffuse),
        ambient: rgba(m.ambient, defaults.ambient),
        specular: rgba(m.specular, defaults.specular),
        emissive: defaults.emissive,
        shininess: m.shininess.unwrap_or(defaults.shininess),
        texture,
    }
}

/// Decodes an image file into RGBA8.
fn load_texture(path: &Path) -> Result<TextureData, ModelError> {
    let image = image::open(path).map_err(|source| ModelError::Texture {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    Ok(TextureData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
