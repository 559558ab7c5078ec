use std::path::PathBuf;

/// Errors raised while importing a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unsupported model format for {} (expected .gltf, .glb or .obj)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to import glTF {}", path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to import OBJ {}", path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load texture {}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} contains no triangle meshes", path.display())]
    Empty { path: PathBuf },
}
