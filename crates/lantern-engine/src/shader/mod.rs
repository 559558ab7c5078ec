//! WGSL shader programs loaded from disk.

mod error;
mod program;
mod reflect;

pub use error::{ShaderError, ShaderStage};
pub use program::ShaderProgram;
pub use reflect::{BindingDecl, EntryPoint};
