use std::path::PathBuf;

/// Errors raised while loading or compiling a shader program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader {name} has no @{stage} entry point")]
    MissingEntryPoint { name: String, stage: ShaderStage },

    #[error("shader {name} failed to compile:\n{log}")]
    Compilation { name: String, log: String },

    #[error("shader {name} does not fit the render pipeline:\n{log}")]
    Pipeline { name: String, log: String },
}

/// Pipeline stage of an entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        })
    }
}
