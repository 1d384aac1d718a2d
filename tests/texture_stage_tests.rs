//! Texture Stage Tests
//!
//! Tests for:
//! - Atom count of the modulate stage with and without a separate alpha blend
//! - Stage ordering across several texture units
//! - Sampler unit assignment
//! - Texture coordinate set routing and validation
//! - Generated fragment source of a textured pass

use loom::prelude::*;
use loom::rtss::GeneratedPass;
use loom::shader::{ProgramWriter, TargetLanguage};

const STAGE_0: i32 = 1000;
const STAGE_1: i32 = 1100;

fn generator() -> ShaderGenerator {
    ShaderGenerator::new(
        Arc::new(SubRenderStateRegistry::with_builtin_factories()),
        GeneratorSettings::default(),
        Box::new(PassthroughCompiler::default()),
    )
}

fn unit(texture: u64) -> TextureUnitState {
    TextureUnitState::new().with_texture(TextureId(texture), TextureType::Tex2D)
}

fn build(pass: &mut Pass) -> &GeneratedPass {
    let mut generator = generator();
    let outcome = generator.build_pass(pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    assert!(outcome.is_generated(), "{outcome:?}");
    generator.generated_pass(pass, DEFAULT_SCHEME_NAME).unwrap()
}

fn group_lines(generated: &GeneratedPass, group: i32) -> Vec<String> {
    generated
        .programs
        .fragment()
        .entry_function()
        .invocations_in_group(group)
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// Blend Sequences
// ============================================================================

#[test]
fn modulate_with_matching_alpha_emits_four_atoms() {
    let mut pass = Pass::new("modulate").with_texture_unit(unit(1));

    let lines = group_lines(build(&mut pass), STAGE_0);
    assert_eq!(
        lines,
        [
            "FFP_SampleTexture(gTextureSampler0, iTexcoord_0, texel);",
            "FFP_Assign(texel, source1);",
            "FFP_Assign(lDiffuse, source2);",
            "FFP_Modulate(source1, source2, oColor_0);",
        ]
    );
}

#[test]
fn separate_alpha_operation_adds_two_atoms() {
    let mut textured = unit(1);
    textured.set_alpha_operation_ex(
        LayerBlendOperationEx::Source1,
        LayerBlendSource::Texture,
        LayerBlendSource::Current,
    );
    let mut pass = Pass::new("alpha").with_texture_unit(textured);

    let lines = group_lines(build(&mut pass), STAGE_0);
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[4], "FFP_Assign(texel.w, source1.w);");
    assert_eq!(lines[5], "FFP_Assign(source1.w, oColor_0.w);");
}

#[test]
fn textual_blend_lines_drive_the_stage() {
    let mut textured = unit(1);
    textured
        .set_colour_op_ex_str("add src_texture src_current")
        .unwrap();
    textured
        .set_alpha_op_ex_str("add src_texture src_current")
        .unwrap();
    let mut pass = Pass::new("additive").with_texture_unit(textured);

    let lines = group_lines(build(&mut pass), STAGE_0);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "FFP_Add(source1, source2, oColor_0);");
}

#[test]
fn unknown_blend_token_is_a_config_error() {
    let mut textured = unit(1);
    assert!(matches!(
        textured.set_colour_op_ex_str("blend_everything src_texture src_current"),
        Err(ConfigError::InvalidToken { .. })
    ));
}

// ============================================================================
// Multiple Units
// ============================================================================

#[test]
fn second_unit_blends_over_the_first() {
    let mut pass = Pass::new("detail")
        .with_texture_unit(unit(1))
        .with_texture_unit(unit(2));
    let generated = build(&mut pass);

    let stage1 = group_lines(generated, STAGE_1);
    assert_eq!(stage1[0], "FFP_SampleTexture(gTextureSampler1, iTexcoord_1, texel);");
    assert_eq!(stage1[2], "FFP_Assign(oColor_0, source2);");

    let order: Vec<_> = generated
        .programs
        .fragment()
        .entry_function()
        .sorted_invocations()
        .into_iter()
        .map(|atom| atom.group_order())
        .collect();
    let first_stage1 = order.iter().position(|&group| group == STAGE_1).unwrap();
    assert!(order[..first_stage1].iter().all(|&group| group <= STAGE_0));
}

#[test]
fn samplers_take_consecutive_units() {
    let mut pass = Pass::new("three")
        .with_texture_unit(unit(1))
        .with_texture_unit(unit(2))
        .with_texture_unit(unit(3));
    let params = &build(&mut pass).fragment_params;

    assert_eq!(params.sampler_count(), 3);
    for i in 0..3 {
        let id = params.id_of(&format!("gTextureSampler{i}")).unwrap();
        assert_eq!(params.sampler_unit(id), Some(i));
    }
}

#[test]
fn too_many_units_are_rejected() {
    let settings = GeneratorSettings {
        max_texture_samplers: 2,
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(
        Arc::new(SubRenderStateRegistry::with_builtin_factories()),
        settings,
        Box::new(PassthroughCompiler::default()),
    );
    let mut pass = Pass::new("greedy")
        .with_texture_unit(unit(1))
        .with_texture_unit(unit(2))
        .with_texture_unit(unit(3));

    let err = generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap_err();
    assert_eq!(err, ConfigError::TooManySamplers { requested: 3, max: 2 });
}

#[test]
fn texture_units_beyond_the_fragment_groups_are_rejected() {
    // Unit 20 would emit into the colour-end group.
    let settings = GeneratorSettings {
        max_texture_samplers: 64,
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(
        Arc::new(SubRenderStateRegistry::with_builtin_factories()),
        settings,
        Box::new(PassthroughCompiler::default()),
    );
    let mut pass = Pass::new("layered");
    for i in 0..21 {
        pass = pass.with_texture_unit(unit(i));
    }

    let err = generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap_err();
    assert_eq!(err, ConfigError::TooManySamplers { requested: 21, max: 20 });

    pass.texture_units.truncate(20);
    let outcome = generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    assert!(outcome.is_generated(), "{outcome:?}");
}

// ============================================================================
// Texture Coordinates
// ============================================================================

#[test]
fn tex_coord_set_selects_the_vertex_input() {
    let mut textured = unit(1);
    textured.set_tex_coord_set(2).unwrap();
    let mut pass = Pass::new("uv2").with_texture_unit(textured);
    let generated = build(&mut pass);

    let vs = generated.programs.vertex();
    assert!(vs.find_input(loom::shader::Semantic::TextureCoordinates, 2).is_some());
    assert!(vs.find_input(loom::shader::Semantic::TextureCoordinates, 0).is_none());
}

#[test]
fn tex_coord_set_out_of_range_is_rejected() {
    let mut textured = unit(1);
    assert_eq!(
        textured.set_tex_coord_set(8),
        Err(ConfigError::UvSetOutOfRange { set: 8, max: 7 })
    );
    assert_eq!(textured.tex_coord_set(), 0);
}

// ============================================================================
// Generated Source
// ============================================================================

#[test]
fn textured_pass_source() {
    let mut pass = Pass::new("source").with_texture_unit(unit(1));
    let generated = build(&mut pass);
    let source = ProgramWriter::new(TargetLanguage::Glsl330, false)
        .write_program_set(&generated.programs)
        .unwrap();

    assert!(source.vertex.contains("FFP_Transform(worldviewproj_matrix, iPos_0, gl_Position);"));
    assert!(source.vertex.contains("FFP_Assign(iTexcoord_0, vTexcoord_0);"));
    assert!(source.fragment.contains("uniform sampler2D gTextureSampler0;"));
    assert!(source.fragment.contains("FFP_SampleTexture(gTextureSampler0, vTexcoord_0, texel);"));
    assert!(source.fragment.contains("#include \"FFPLib_Texturing.glsl\""));

    let sample = source.fragment.find("FFP_SampleTexture").unwrap();
    let colour_begin = source.fragment.find("FFP_Assign(lDiffuse, oColor_0);").unwrap();
    assert!(colour_begin < sample);
}
