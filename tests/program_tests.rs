//! Program Model Tests
//!
//! Tests for:
//! - Parameter registry deduplication (inputs, outputs, locals, uniforms)
//! - Type conflicts reported as resolve errors
//! - Atom ordering by (group, counter), independent of insertion order
//! - GLSL serialization: varyings, gl_Position, ES outputs, library inlining

use loom::ResolveError;
use loom::shader::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, Operand, OperandMask, Program, ProgramSet,
    ProgramType, ProgramWriter, Semantic, TargetLanguage,
};

fn position_input(program: &mut Program) -> loom::shader::ParamId {
    program
        .resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float4,
        )
        .unwrap()
}

/// Vertex program transforming the position and passing one UV set through,
/// fragment program sampling it.
fn textured_program_set() -> ProgramSet {
    let mut programs = ProgramSet::new();
    let (vs, ps) = programs.split_mut();

    let wvp = vs.resolve_auto_parameter(AutoConstantType::WorldViewProjMatrix, 0);
    let pos_in = position_input(vs);
    let pos_out = vs
        .resolve_output_parameter(
            Semantic::Position,
            Some(0),
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )
        .unwrap();
    let uv_in = vs
        .resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let uv_out = vs
        .resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    vs.add_dependency("FFPLib_Transform");
    let operands = [vs.op_in(wvp), vs.op_in(pos_in), vs.op_out(pos_out)];
    let uv = (vs.op_in(uv_in), vs.op_out(uv_out));
    vs.stage(100).call("FFP_Transform", operands);
    vs.stage(400).assign(uv.0, uv.1);

    let sampler = ps
        .resolve_parameter(GpuConstantType::Sampler2D, Some(0), "gTextureSampler")
        .unwrap();
    let uv = ps
        .resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let colour = ps
        .resolve_output_parameter(Semantic::Color, Some(0), Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    ps.add_dependency("FFPLib_Common");
    ps.add_dependency("FFPLib_Texturing");
    let operands = [ps.op_in(sampler), ps.op_in(uv), ps.op_out(colour)];
    ps.stage(1000).call("FFP_SampleTexture", operands);

    programs
}

// ============================================================================
// Parameter Registry
// ============================================================================

#[test]
fn input_resolved_twice_is_the_same_parameter() {
    let mut program = Program::new(ProgramType::Vertex);
    let first = position_input(&mut program);
    let second = position_input(&mut program);

    assert_eq!(first, second);
    assert_eq!(program.parameter_count(), 1);
    assert_eq!(program.parameter(first).name(), "iPos_0");
}

#[test]
fn input_with_conflicting_type_is_rejected() {
    let mut program = Program::new(ProgramType::Vertex);
    position_input(&mut program);

    let err = program
        .resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float3,
        )
        .unwrap_err();

    assert!(matches!(err, ResolveError::TypeMismatch { ref name, .. } if name == "iPos_0"));
    assert_eq!(program.parameter_count(), 1);
}

#[test]
fn output_without_index_reuses_matching_content() {
    let mut program = Program::new(ProgramType::Vertex);
    let uv0 = program
        .resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let uv1 = program
        .resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(3),
            GpuConstantType::Float2,
        )
        .unwrap();
    let again = program
        .resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();

    assert_eq!(uv0, again);
    assert_ne!(uv0, uv1);
    assert_eq!(program.parameter(uv1).index(), 1);
    assert_eq!(program.parameter(uv1).name(), "oTexcoord_1");
}

#[test]
fn locals_are_identified_by_name() {
    let mut program = Program::new(ProgramType::Fragment);
    let a = program
        .resolve_local_parameter(Semantic::Color, 0, "texel", GpuConstantType::Float4)
        .unwrap();
    let b = program
        .resolve_local_parameter(Semantic::Color, 7, "texel", GpuConstantType::Float4)
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(program.find_local(Semantic::Color, 0), Some(a));
}

#[test]
fn indexed_uniforms_dedupe_and_unindexed_uniforms_do_not() {
    let mut program = Program::new(ProgramType::Fragment);
    let a = program
        .resolve_parameter(GpuConstantType::Float4, Some(2), "gColour")
        .unwrap();
    let b = program
        .resolve_parameter(GpuConstantType::Float4, Some(2), "gColour")
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(program.parameter(a).name(), "gColour2");

    let c = program.resolve_parameter(GpuConstantType::Float1, None, "gTmp").unwrap();
    let d = program.resolve_parameter(GpuConstantType::Float1, None, "gTmp").unwrap();
    assert_ne!(c, d);
    assert_ne!(program.parameter(c).name(), program.parameter(d).name());
    assert_eq!(program.uniform_count(), 3);
}

#[test]
fn unindexed_and_indexed_uniforms_never_share_a_name() {
    let mut program = Program::new(ProgramType::Fragment);
    let unindexed = program
        .resolve_parameter(GpuConstantType::Float4, None, "gScratch")
        .unwrap();
    let indexed = program
        .resolve_parameter(GpuConstantType::Float4, Some(0), "gScratch")
        .unwrap();

    assert_ne!(unindexed, indexed);
    assert_ne!(program.parameter(unindexed).name(), program.parameter(indexed).name());
    assert_eq!(program.parameter(indexed).name(), "gScratch0");

    let squatter = program
        .resolve_parameter(GpuConstantType::Float4, Some(1), "gScratch_u")
        .unwrap();
    let next = program
        .resolve_parameter(GpuConstantType::Float4, None, "gScratch")
        .unwrap();
    assert_eq!(program.parameter(squatter).name(), "gScratch_u1");
    assert_eq!(program.parameter(next).name(), "gScratch_u2");

    let source = ProgramWriter::new(TargetLanguage::Glsl330, false)
        .write_program(&program)
        .unwrap();
    assert_eq!(source.matches("uniform vec4 gScratch0;").count(), 1);
}

#[test]
fn auto_parameters_dedupe_by_kind_and_data() {
    let mut program = Program::new(ProgramType::Vertex);
    let world = program.resolve_auto_parameter(AutoConstantType::WorldMatrix, 0);
    assert_eq!(world, program.resolve_auto_parameter(AutoConstantType::WorldMatrix, 0));

    let tex0 = program.resolve_auto_parameter(AutoConstantType::TextureMatrix, 0);
    let tex1 = program.resolve_auto_parameter(AutoConstantType::TextureMatrix, 1);
    assert_ne!(tex0, tex1);
    assert_eq!(program.parameter(world).ty(), GpuConstantType::Matrix4x4);
    assert!(program.uniform_by_name("world_matrix").is_some());
}

// ============================================================================
// Atom Ordering
// ============================================================================

#[test]
fn atoms_sort_by_group_then_counter() {
    let mut program = Program::new(ProgramType::Fragment);
    let atom = |name: &str, group, counter| {
        FunctionInvocation::new(name, group, counter).with_operands([Operand::output("oColor_0")])
    };
    program.add_invocation(atom("c", 3000, 0));
    program.add_invocation(atom("b2", 1000, 1));
    program.add_invocation(atom("a", 100, 0));
    program.add_invocation(atom("b1", 1000, 0));

    let order: Vec<_> = program
        .entry_function()
        .sorted_invocations()
        .into_iter()
        .map(|atom| atom.function_name().to_string())
        .collect();
    assert_eq!(order, ["a", "b1", "b2", "c"]);
}

#[test]
fn stage_builder_continues_the_group_counter() {
    let mut program = Program::new(ProgramType::Fragment);
    let colour = program
        .resolve_output_parameter(Semantic::Color, Some(0), Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let out = program.op_out(colour);

    program.stage(1000).assign(Operand::literal(1.0), out.clone());
    program
        .stage(1000)
        .assign(Operand::literal(0.5), out.with_mask(OperandMask::W));

    let keys: Vec<_> = program
        .entry_function()
        .invocations_in_group(1000)
        .map(FunctionInvocation::order_key)
        .collect();
    assert_eq!(keys, [(1000, 0), (1000, 1)]);
    assert_eq!(
        program.entry_function().sorted_invocations()[1].to_string(),
        "FFP_Assign(0.5, oColor_0.w);"
    );
}

#[test]
fn serialization_is_reproducible() {
    let writer = ProgramWriter::new(TargetLanguage::Glsl330, false);
    let first = writer.write_program_set(&textured_program_set()).unwrap();
    let second = writer.write_program_set(&textured_program_set()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// GLSL Writer
// ============================================================================

#[test]
fn glsl330_links_stages_through_varyings() {
    let writer = ProgramWriter::new(TargetLanguage::Glsl330, false);
    let source = writer.write_program_set(&textured_program_set()).unwrap();

    assert!(source.vertex.contains("FFP_Transform(worldviewproj_matrix, iPos_0, gl_Position);"));
    assert!(source.vertex.contains("FFP_Assign(iTexcoord_0, vTexcoord_0);"));
    assert!(source.vertex.contains("out vec2 vTexcoord_0;"));
    assert!(!source.vertex.contains("oPos_0"));

    assert!(source.fragment.contains("in vec2 vTexcoord_0;"));
    assert!(source.fragment.contains("uniform sampler2D gTextureSampler0;"));
    assert!(source.fragment.contains("layout(location = 0) out vec4 oColor_0;"));
    assert!(source.fragment.contains("FFP_SampleTexture(gTextureSampler0, vTexcoord_0, oColor_0);"));
    assert!(source.geometry.is_none());
}

#[test]
fn glsl_es_uses_legacy_qualifiers() {
    let writer = ProgramWriter::new(TargetLanguage::GlslEs100, false);
    let source = writer.write_program_set(&textured_program_set()).unwrap();

    assert!(source.vertex.starts_with("//"));
    assert!(source.vertex.contains("#version 100"));
    assert!(source.vertex.contains("attribute vec4 iPos_0;"));
    assert!(source.vertex.contains("varying vec2 vTexcoord_0;"));
    assert!(source.fragment.contains("precision mediump float;"));
    assert!(source.fragment.contains("FFP_SampleTexture(gTextureSampler0, vTexcoord_0, gl_FragColor);"));
    assert!(!source.fragment.contains("oColor_0"));
}

#[test]
fn libraries_are_included_or_inlined() {
    let programs = textured_program_set();

    let included = ProgramWriter::new(TargetLanguage::Glsl330, false)
        .write_program(programs.fragment())
        .unwrap();
    assert!(included.contains("#include \"FFPLib_Common.glsl\""));
    assert!(included.contains("#include \"FFPLib_Texturing.glsl\""));

    let inlined = ProgramWriter::new(TargetLanguage::Glsl330, true)
        .write_program(programs.fragment())
        .unwrap();
    assert!(!inlined.contains("#include"));
    assert!(inlined.contains("// ---- FFPLib_Texturing ----"));
    assert!(inlined.contains("FFP_SampleTexture"));
}

#[test]
fn inlining_an_unknown_library_fails() {
    let mut program = Program::new(ProgramType::Fragment);
    program.add_dependency("NoSuchLibrary");

    let err = ProgramWriter::new(TargetLanguage::Glsl330, true)
        .write_program(&program)
        .unwrap_err();
    assert!(matches!(
        err,
        loom::LoomError::Resolve(ResolveError::MissingLibrary(ref name)) if name == "NoSuchLibrary"
    ));
}

#[test]
fn geometry_stage_is_unsupported_on_glsl_es() {
    let programs = ProgramSet::new().with_geometry();
    let writer = ProgramWriter::new(TargetLanguage::GlslEs100, false);

    assert!(matches!(
        writer.write_program_set(&programs),
        Err(loom::LoomError::UnsupportedStage { stage: "geometry", .. })
    ));
    assert!(
        ProgramWriter::new(TargetLanguage::Glsl330, false)
            .write_program_set(&programs)
            .unwrap()
            .geometry
            .is_some()
    );
}
