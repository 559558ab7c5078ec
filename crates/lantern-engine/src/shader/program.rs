use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::error::{ShaderError, ShaderStage};
use super::reflect::{BindingDecl, EntryPoint, reflect};

/// A WGSL program with one vertex and one fragment entry point.
///
/// Loading parses the source and checks that both stages are present, so a
/// broken shader file is reported at startup.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    name: String,
    source: String,
    entry_points: Vec<EntryPoint>,
    bindings: Vec<BindingDecl>,
    vertex_entry: String,
    fragment_entry: String,
}

impl ShaderProgram {
    /// Reads a WGSL file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_source(path.display().to_string(), source)
    }

    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Result<Self, ShaderError> {
        let name = name.into();
        let source = source.into();

        let reflection = reflect(&source).map_err(|log| ShaderError::Compilation {
            name: name.clone(),
            log,
        })?;
        let entry_points = reflection.entry_points;
        let bindings = reflection.bindings;

        let entry_for = |stage: ShaderStage| {
            entry_points
                .iter()
                .find(|e| e.stage == stage)
                .map(|e| e.name.clone())
                .ok_or_else(|| ShaderError::MissingEntryPoint {
                    name: name.clone(),
                    stage,
                })
        };
        let vertex_entry = entry_for(ShaderStage::Vertex)?;
        let fragment_entry = entry_for(ShaderStage::Fragment)?;

        Ok(Self {
            name,
            source,
            entry_points,
            bindings,
            vertex_entry,
            fragment_entry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    pub fn bindings(&self) -> &[BindingDecl] {
        &self.bindings
    }

    /// Summary of entry points and resource bindings.
    pub fn info(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Program: {}", self.name);
        for ep in &self.entry_points {
            let _ = writeln!(out, "  @{} {}", ep.stage, ep.name);
        }
        for b in &self.bindings {
            let _ = writeln!(
                out,
                "  group {} binding {}: {} ({})",
                b.group, b.binding, b.name, b.ty
            );
        }
        out.truncate(out.trim_end().len());
        out
    }

    /// Creates the GPU module and logs the compiler's messages.
    ///
    /// Errors reported by the compiler, or a validation error raised while
    /// creating the module, are returned; warnings are logged.
    pub fn create_module(&self, device: &wgpu::Device) -> Result<wgpu::ShaderModule, ShaderError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.name),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        });
        let validation = pollster::block_on(scope.pop());

        let info = pollster::block_on(module.get_compilation_info());
        let mut errors = String::new();
        for msg in &info.messages {
            let location = msg
                .location
                .as_ref()
                .map(|l| format!("{}:{}: ", l.line_number, l.line_position))
                .unwrap_or_default();
            match msg.message_type {
                wgpu::CompilationMessageType::Error => {
                    let _ = writeln!(errors, "{location}{}", msg.message);
                }
                wgpu::CompilationMessageType::Warning => {
                    log::warn!("{}: {location}{}", self.name, msg.message);
                }
                wgpu::CompilationMessageType::Info => {
                    log::debug!("{}: {location}{}", self.name, msg.message);
                }
            }
        }

        if errors.is_empty()
            && let Some(err) = validation
        {
            let _ = writeln!(errors, "{err}");
        }

        if !errors.is_empty() {
            return Err(ShaderError::Compilation {
                name: self.name.clone(),
                log: errors,
            });
        }

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_source_picks_entry_points() {
        let src = "@vertex fn v() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }\n\
                   @fragment fn f() {}\n";
        let p = ShaderProgram::from_source("inline", src).unwrap();
        assert_eq!(p.vertex_entry(), "v");
        assert_eq!(p.fragment_entry(), "f");
    }

    #[test]
    fn missing_fragment_stage_is_an_error() {
        let src = "@vertex fn v() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        let err = ShaderProgram::from_source("inline", src).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::MissingEntryPoint { stage: ShaderStage::Fragment, .. }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ShaderProgram::load("does/not/exist.wgsl").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.wgsl"));
    }

    #[test]
    fn info_lists_stages_and_bindings() {
        let src = "struct M { x: vec4<f32> }\n\
                   @binding(0) @group(0) var<uniform> m: M;\n\
                   @vertex fn v() -> @builtin(position) vec4<f32> { return m.x; }\n\
                   @fragment fn f() {}";
        let info = ShaderProgram::from_source("inline", src).unwrap().info();
        assert!(info.contains("@vertex v"));
        assert!(info.contains("group 0 binding 0: m (M)"));
        assert!(!info.ends_with('\n'));
    }

    #[test]
    fn commented_out_entry_point_is_not_chosen() {
        let src = "/* outer /* inner */ @vertex fn ghost() {} */\n\
                   @vertex fn real() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }\n\
                   @fragment fn f() {}";
        let p = ShaderProgram::from_source("inline", src).unwrap();
        assert_eq!(p.vertex_entry(), "real");
    }

    #[test]
    fn parse_error_is_a_compilation_error() {
        let err = ShaderProgram::from_source("inline", "@vertex fn v( {}").unwrap_err();
        assert!(matches!(err, ShaderError::Compilation { .. }));
    }
}
