//! Reflection of the bundled shaders.

mod common;

use common::AssetRoot;
use scene_viewer::application::{FRAGMENT_SHADER_PATHS, RENDERER_UNIFORMS, VERTEX_SHADER_PATHS};
use scene_viewer::resources::Material;
use scene_viewer::shader::{ShaderLoader, ShaderProgram, ShaderStage, UniformType};
use scene_viewer::ui::{ParameterField, SLIDERS};
use std::sync::Arc;

fn bundled_program() -> ShaderProgram {
    let root = env!("CARGO_MANIFEST_DIR");
    let vertex = ShaderLoader::new(ShaderStage::Vertex)
        .with_root(root)
        .load(&VERTEX_SHADER_PATHS)
        .unwrap();
    let fragment = ShaderLoader::new(ShaderStage::Fragment)
        .with_root(root)
        .load(&FRAGMENT_SHADER_PATHS)
        .unwrap();
    ShaderProgram::build(vertex, fragment).unwrap()
}

#[test]
fn vertex_inputs_follow_declared_locations() {
    let program = bundled_program();
    let inputs: Vec<(&str, u32)> = program
        .vertex_inputs()
        .iter()
        .map(|input| (input.name.as_str(), input.location))
        .collect();
    for (name, location) in [
        ("VertexPosition", 0),
        ("VertexNormal", 1),
        ("VertexTangent", 2),
        ("VertexBitangent", 3),
        ("VertexTexCoord", 4),
    ] {
        assert!(inputs.contains(&(name, location)), "{name} missing from {inputs:?}");
    }
}

#[test]
fn renderer_uniforms_are_all_reflected() {
    let program = bundled_program();
    for name in RENDERER_UNIFORMS {
        assert!(program.uniform(name).is_some(), "{name} not reflected");
    }
    assert_eq!(program.uniform("WorldMatrix").unwrap().ty, UniformType::Mat4);
    assert_eq!(program.uniform("LightAttenuation").unwrap().ty, UniformType::Vec2);
    assert_eq!(program.groups(), [0, 1, 2, 3]);
}

#[test]
fn material_owns_everything_but_renderer_uniforms() {
    let program = Arc::new(bundled_program());
    let material = Material::new(Arc::clone(&program), &RENDERER_UNIFORMS);

    let mut names: Vec<&str> = material.uniform_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        [
            "AmbientColor",
            "Color",
            "ColorTexture",
            "DebugColors",
            "EnvironmentMaxLod",
            "EnvironmentTexture",
            "NormalTexture",
            "ReflectionIntensity",
            "RefractionIndex",
            "RefractionIntensity",
            "Roughness",
            "SpecularTexture",
        ]
    );
    assert_eq!(
        program.uniform("EnvironmentTexture").unwrap().ty,
        UniformType::TextureCube
    );
}

#[test]
fn every_slider_drives_a_uniform_of_matching_type() {
    let program = bundled_program();
    for slider in &SLIDERS {
        let info = program
            .uniform(slider.uniform)
            .unwrap_or_else(|| panic!("{} is not a shader uniform", slider.uniform));
        let expected = match slider.field {
            ParameterField::DebugColor(_) => UniformType::Vec3,
            _ => UniformType::Float,
        };
        assert_eq!(info.ty, expected, "{}", slider.label);
    }
}

#[test]
fn missing_shader_file_is_an_io_error() {
    let assets = AssetRoot::new("shader-io");
    let err = ShaderLoader::new(ShaderStage::Fragment)
        .with_root(assets.path())
        .load(&FRAGMENT_SHADER_PATHS)
        .unwrap_err();
    assert!(err.to_string().contains("common.wgsl"), "{err}");
}

#[test]
fn shader_roughness_floor_sits_below_the_slider_range() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders/default_pbr.wgsl");
    let source = std::fs::read_to_string(path).unwrap();
    let floor: f32 = source
        .lines()
        .find_map(|line| line.strip_prefix("const MIN_ROUGHNESS: f32 = "))
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap()
        .parse()
        .unwrap();
    assert!(source.contains("clamp(material.Roughness, MIN_ROUGHNESS, 1.0)"));

    let roughness = SLIDERS
        .iter()
        .find(|slider| slider.field == ParameterField::Roughness)
        .unwrap();
    assert!(floor < roughness.min, "{floor} swallows slider values near {}", roughness.min);
}
