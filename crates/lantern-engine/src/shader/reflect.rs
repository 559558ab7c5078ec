//! Entry points and resource bindings read from the parsed WGSL module.

use naga::{ImageDimension, Module, TypeInner};

use super::error::ShaderStage;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryPoint {
    pub stage: ShaderStage,
    pub name: String,
}

/// A global resource declared with `@group(g) @binding(b)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BindingDecl {
    pub group: u32,
    pub binding: u32,
    pub name: String,
    /// Declared type, e.g. `Matrices`, `texture_2d` or `sampler`.
    pub ty: String,
}

/// Declarations of one WGSL source.
#[derive(Debug, Clone, Default)]
pub struct Reflection {
    pub entry_points: Vec<EntryPoint>,
    /// Sorted by `(group, binding)`.
    pub bindings: Vec<BindingDecl>,
}

/// Parses `source` with naga's WGSL front-end.
///
/// On failure returns the diagnostic rendered against the source.
pub fn reflect(source: &str) -> Result<Reflection, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Ok(Reflection {
        entry_points: entry_points(&module),
        bindings: bindings(&module),
    })
}

fn entry_points(module: &Module) -> Vec<EntryPoint> {
    module
        .entry_points
        .iter()
        .filter_map(|ep| {
            let stage = match ep.stage {
                naga::ShaderStage::Vertex => ShaderStage::Vertex,
                naga::ShaderStage::Fragment => ShaderStage::Fragment,
                naga::ShaderStage::Compute => ShaderStage::Compute,
                _ => return None,
            };
            Some(EntryPoint {
                stage,
                name: ep.name.clone(),
            })
        })
        .collect()
}

fn bindings(module: &Module) -> Vec<BindingDecl> {
    let mut out: Vec<BindingDecl> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let rb = var.binding.as_ref()?;
            Some(BindingDecl {
                group: rb.group,
                binding: rb.binding,
                name: var.name.clone().unwrap_or_default(),
                ty: type_label(module, var.ty),
            })
        })
        .collect();
    out.sort_by_key(|b| (b.group, b.binding));
    out
}

fn type_label(module: &Module, ty: naga::Handle<naga::Type>) -> String {
    let ty = &module.types[ty];
    if let Some(name) = &ty.name {
        return name.clone();
    }
    match &ty.inner {
        TypeInner::Image { dim, arrayed, .. } => {
            let dim = match dim {
                ImageDimension::D1 => "1d",
                ImageDimension::D2 => "2d",
                ImageDimension::D3 => "3d",
                ImageDimension::Cube => "cube",
            };
            let array = if *arrayed { "_array" } else { "" };
            format!("texture_{dim}{array}")
        }
        TypeInner::Sampler { comparison: true } => "sampler_comparison".into(),
        TypeInner::Sampler { comparison: false } => "sampler".into(),
        _ => "?".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
// @vertex fn commented_out() {}
struct Matrices { pvm: mat4x4<f32> }
struct Material { diffuse: vec4<f32> }

@group(0) @binding(0) var<uniform> matrices: Matrices;
@binding(1) @group(1) var tex_unit: texture_2d<f32>;
@group(1)
@binding(0)
var<uniform> material: Material;
@group(1) @binding(2) var tex_sampler: sampler;

/* outer /* inner */ @fragment fn also_commented() {} */
@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return matrices.pvm * vec4<f32>(pos, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return material.diffuse * textureSample(tex_unit, tex_sampler, vec2<f32>(0.5, 0.5));
}
"#;

    #[test]
    fn finds_entry_points_outside_nested_comments() {
        let r = reflect(SRC).unwrap();
        assert_eq!(
            r.entry_points,
            vec![
                EntryPoint { stage: ShaderStage::Vertex, name: "vs_main".into() },
                EntryPoint { stage: ShaderStage::Fragment, name: "fs_main".into() },
            ]
        );
    }

    #[test]
    fn finds_bindings_in_any_attribute_order() {
        let r = reflect(SRC).unwrap();
        let summary: Vec<(u32, u32, &str, &str)> = r
            .bindings
            .iter()
            .map(|d| (d.group, d.binding, d.name.as_str(), d.ty.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 0, "matrices", "Matrices"),
                (1, 0, "material", "Material"),
                (1, 1, "tex_unit", "texture_2d"),
                (1, 2, "tex_sampler", "sampler"),
            ]
        );
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = reflect("@group(x) @binding(0) var a: f32;").unwrap_err();
        assert!(!err.is_empty());
    }
}
