use deferred_ngin::{
    config::ShaderPolicy,
    error::{RenderError, ResourceKind, Stage},
    pipelines::{geometry, lighting, output, shadow},
    shader::CompiledProgram,
};

const SCREEN_VS: &str = lighting::SCREEN_VERTEX_SHADER;

const BROKEN_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0
}
"#;

fn strict(label: &str, vs: &str, fs: &str) -> Result<CompiledProgram, RenderError> {
    CompiledProgram::compile(label, vs, fs, ShaderPolicy::Strict)
}

#[test]
fn bundled_programs_compile_and_link() {
    let programs = [
        ("geometry", geometry::VERTEX_SHADER, geometry::FRAGMENT_SHADER),
        ("lighting", SCREEN_VS, lighting::FRAGMENT_SHADER),
        ("shadow", SCREEN_VS, shadow::FRAGMENT_SHADER),
        ("composite", SCREEN_VS, output::COMPOSITE_SHADER),
        (
            "debug",
            output::DEBUG_VERTEX_SHADER,
            output::DEBUG_FRAGMENT_SHADER,
        ),
    ];
    for (label, vs, fs) in programs {
        let program = strict(label, vs, fs).unwrap_or_else(|e| panic!("{label}: {e}"));
        assert!(program.is_valid(), "{label}");
        assert_eq!(program.label(), label);
    }
}

#[test]
fn geometry_reflection() {
    let program = strict("geometry", geometry::VERTEX_SHADER, geometry::FRAGMENT_SHADER)
        .expect("geometry compiles");
    assert_eq!(program.attribute_location("position"), Some(0));
    assert_eq!(program.attribute_location("uv"), Some(4));
    assert_eq!(program.attribute_location("model_3"), Some(8));
    assert_eq!(program.uniform_block("camera"), Some((0, 0)));
    assert_eq!(program.uniform_block("Camera"), Some((0, 0)));
    assert_eq!(program.uniform_block("Material"), Some((1, 0)));
    assert_eq!(program.uniform_binding("cube_map"), Some((1, 5)));
    // textures are resources but not uniform blocks
    assert_eq!(program.uniform_block("albedo_map"), None);
}

#[test]
fn lighting_reflection() {
    let program = strict("lighting", SCREEN_VS, lighting::FRAGMENT_SHADER)
        .expect("lighting compiles");
    assert_eq!(program.require_block("LightBatch").ok(), Some((0, 0)));
    assert_eq!(program.require_uniform("position_map").ok(), Some((1, 0)));
    assert_eq!(program.require_uniform("specular_map").ok(), Some((1, 2)));
}

#[test]
fn missing_names_are_reported() {
    let program = strict("lighting", SCREEN_VS, lighting::FRAGMENT_SHADER)
        .expect("lighting compiles");
    assert_eq!(program.attribute_location("tangent"), None);
    match program.require_attribute("tangent") {
        Err(RenderError::ResourceNotFound { kind, name }) => {
            assert_eq!(kind, ResourceKind::Attribute);
            assert_eq!(name, "tangent");
        }
        other => panic!("expected a missing attribute, got {other:?}"),
    }
    assert!(matches!(
        program.require_block("Camera"),
        Err(RenderError::ResourceNotFound {
            kind: ResourceKind::UniformBlock,
            ..
        })
    ));
}

#[test]
fn syntax_error_is_fatal_when_strict() {
    match strict("broken", SCREEN_VS, BROKEN_FS) {
        Err(RenderError::ShaderCompile { stage, diagnostic }) => {
            assert_eq!(stage, Stage::Fragment);
            assert!(!diagnostic.is_empty());
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn syntax_error_is_kept_when_lenient() {
    let program = CompiledProgram::compile("broken", SCREEN_VS, BROKEN_FS, ShaderPolicy::Lenient)
        .expect("lenient compile never fails");
    assert!(!program.is_valid());
    assert!(program.diagnostic().is_some());
    // the vertex stage parsed, so its names are still known
    assert_eq!(program.attribute_location("uv"), Some(1));
}

#[test]
fn mismatched_interface_fails_to_link() {
    let fs = r#"
@fragment
fn fs_main(@location(0) uv: vec4<f32>) -> @location(0) vec4<f32> {
    return uv;
}
"#;
    assert!(matches!(
        strict("mismatch", SCREEN_VS, fs),
        Err(RenderError::ShaderLink { .. })
    ));

    let fs = r#"
@fragment
fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {
    return tint;
}
"#;
    assert!(matches!(
        strict("unwritten", SCREEN_VS, fs),
        Err(RenderError::ShaderLink { .. })
    ));
}

#[test]
fn vertex_stage_must_write_position() {
    let vs = r#"
struct Out {
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) uv: vec2<f32>) -> Out {
    var out: Out;
    out.uv = uv;
    return out;
}
"#;
    let fs = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
    // naga may already reject this during validation
    assert!(matches!(
        strict("headless", vs, fs),
        Err(RenderError::ShaderLink { .. })
            | Err(RenderError::ShaderCompile {
                stage: Stage::Vertex,
                ..
            })
    ));
}
