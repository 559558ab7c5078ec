//! Model import.
//!
//! Loads glTF/GLB through `gltf` and OBJ/MTL through `tobj` into a flat list
//! of triangle meshes plus materials. Node transforms are baked into vertex
//! positions; the model keeps its own bounds so callers can fit it to a unit
//! box with [`Model::unit_transform`].

mod error;
mod gltf_import;
mod mesh;
mod obj_import;

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};

pub use error::ModelError;
pub use mesh::{Bounds, Material, Mesh, TextureData, Vertex};

/// An imported model, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct Model {
    pub source: PathBuf,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    bounds: Bounds,
}

impl Model {
    /// Imports a model, choosing the importer from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let (meshes, materials) = match extension.as_deref() {
            Some("gltf" | "glb") => gltf_import::load(path)?,
            Some("obj") => obj_import::load(path)?,
            _ => {
                return Err(ModelError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        Self::from_parts(path, meshes, materials)
    }

    /// Imports OBJ data from memory. `load_mtl` resolves `mtllib` names.
    pub fn load_obj_from_reader<R, F>(
        reader: &mut R,
        name: impl AsRef<Path>,
        load_mtl: F,
    ) -> Result<Self, ModelError>
    where
        R: BufRead,
        F: Fn(&Path) -> tobj::MTLLoadResult,
    {
        let name = name.as_ref();
        let (meshes, materials) = obj_import::load_from_reader(reader, name, load_mtl)?;
        Self::from_parts(name, meshes, materials)
    }

    fn from_parts(
        path: &Path,
        meshes: Vec<Mesh>,
        materials: Vec<Material>,
    ) -> Result<Self, ModelError> {
        let meshes: Vec<Mesh> = meshes
            .into_iter()
            .filter(|m| m.triangle_count() > 0)
            .collect();

        if meshes.is_empty() {
            return Err(ModelError::Empty {
                path: path.to_path_buf(),
            });
        }

        let mut bounds = Bounds::EMPTY;
        for v in meshes.iter().flat_map(|m| &m.vertices) {
            bounds.include(Vec3::from(v.position));
        }

        Ok(Self {
            source: path.to_path_buf(),
            meshes,
            materials,
            bounds,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Centers the model on the origin and scales its largest side to 1.
    pub fn unit_transform(&self) -> Mat4 {
        self.bounds.unit_transform()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Human-readable summary for the startup log.
    pub fn info(&self) -> String {
        let textured = self
            .materials
            .iter()
            .filter(|m| m.texture.is_some())
            .count();
        let b = self.bounds;

        let mut out = String::new();
        let _ = writeln!(out, "Model: {}", self.source.display());
        let _ = writeln!(
            out,
            "  meshes: {}  vertices: {}  triangles: {}",
            self.meshes.len(),
            self.vertex_count(),
            self.triangle_count()
        );
        let _ = writeln!(
            out,
            "  materials: {}  textured: {}",
            self.materials.len(),
            textured
        );
        let _ = write!(
            out,
            "  bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0.0 0.0 0.0
v 4.0 0.0 0.0
v 4.0 2.0 0.0
v 0.0 2.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const QUAD_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
Ka 0.1 0.0 0.0
Ns 32.0
";

    fn no_mtl(_: &Path) -> tobj::MTLLoadResult {
        Err(tobj::LoadError::OpenFileFailed)
    }

    fn quad_mtl(_: &Path) -> tobj::MTLLoadResult {
        tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(QUAD_MTL)))
    }

    fn load(obj: &str, mtl: fn(&Path) -> tobj::MTLLoadResult) -> Result<Model, ModelError> {
        Model::load_obj_from_reader(&mut BufReader::new(Cursor::new(obj)), "test.obj", mtl)
    }

    #[test]
    fn quad_is_triangulated() {
        let model = load(QUAD_OBJ, quad_mtl).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.vertex_count(), 4);
    }

    #[test]
    fn material_is_resolved() {
        let model = load(QUAD_OBJ, quad_mtl).unwrap();
        let mesh = &model.meshes[0];
        let material = &model.materials[mesh.material];
        assert_eq!(material.name, "red");
        assert_eq!(material.diffuse, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(material.shininess, 32.0);
        assert!(material.texture.is_none());
    }

    #[test]
    fn missing_material_library_falls_back_to_default() {
        let model = load(QUAD_OBJ, no_mtl).unwrap();
        let material = &model.materials[model.meshes[0].material];
        assert_eq!(material.name, "default");
    }

    #[test]
    fn uv_v_axis_is_flipped() {
        let model = load(QUAD_OBJ, quad_mtl).unwrap();
        let uvs: Vec<[f32; 2]> = model.meshes[0].vertices.iter().map(|v| v.uv).collect();
        assert!(uvs.contains(&[0.0, 1.0]));
        assert!(uvs.contains(&[1.0, 0.0]));
    }

    #[test]
    fn unit_transform_fits_largest_side() {
        let model = load(QUAD_OBJ, quad_mtl).unwrap();
        let b = model.bounds();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(4.0, 2.0, 0.0));

        let t = model.unit_transform();
        let lo = t.transform_point3(b.min);
        let hi = t.transform_point3(b.max);
        assert!((lo - Vec3::new(-0.5, -0.25, 0.0)).length() < 1e-6);
        assert!((hi - Vec3::new(0.5, 0.25, 0.0)).length() < 1e-6);
    }

    #[test]
    fn points_only_model_is_empty() {
        let err = load("v 0 0 0\nv 1 0 0\n", no_mtl).unwrap_err();
        assert!(matches!(err, ModelError::Empty { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Model::load("scene.dae").unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("scene.dae"));
    }

    #[test]
    fn info_mentions_counts() {
        let model = load(QUAD_OBJ, quad_mtl).unwrap();
        let info = model.info();
        assert!(info.contains("meshes: 1"));
        assert!(info.contains("triangles: 2"));
        assert!(info.contains("materials: 2"));
    }

    #[test]
    fn empty_bounds_give_identity() {
        assert_eq!(Bounds::EMPTY.unit_transform(), Mat4::IDENTITY);
    }
}
