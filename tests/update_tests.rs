//! Per-Object Update Tests
//!
//! Tests for:
//! - Auto constants refreshed for every drawn object
//! - Alpha rejection function and reference pushed without regeneration
//! - Projective texture matrix taken from the bound projector
//! - Texture matrices of animated units
//! - Light uniforms matched to scene lights by kind
//! - Passes without generated state are left alone

use glam::{Mat4, Vec3, Vec4};
use loom::prelude::*;
use loom::rtss::GeneratedPass;

struct Mesh {
    world: Mat4,
}

impl Renderable for Mesh {
    fn world_matrix(&self) -> Mat4 {
        self.world
    }
}

fn generator() -> ShaderGenerator {
    let _ = env_logger::builder().is_test(true).try_init();
    ShaderGenerator::new(
        Arc::new(SubRenderStateRegistry::with_builtin_factories()),
        GeneratorSettings::default(),
        Box::new(PassthroughCompiler::default()),
    )
}

fn unit(texture: u64) -> TextureUnitState {
    TextureUnitState::new().with_texture(TextureId(texture), TextureType::Tex2D)
}

fn camera() -> AutoParamDataSource {
    let mut source = AutoParamDataSource::new();
    source.set_camera(
        Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y),
        Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0),
    );
    source
}

fn draw(generator: &ShaderGenerator, pass: &mut Pass, mesh: &Mesh, source: &AutoParamDataSource) {
    generator.notify_render_single_object(mesh, pass, DEFAULT_SCHEME_NAME, source, &[]);
}

fn generated<'a>(generator: &ShaderGenerator, pass: &'a Pass) -> &'a GeneratedPass {
    generator.generated_pass(pass, DEFAULT_SCHEME_NAME).unwrap()
}

// ============================================================================
// Auto Constants
// ============================================================================

#[test]
fn world_view_projection_follows_the_object() {
    let mut generator = generator();
    let mut pass = Pass::new("brick").with_texture_unit(unit(1));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    let source = camera();

    for x in [0.0, 3.0, -7.5] {
        let mesh = Mesh {
            world: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
        };
        draw(&generator, &mut pass, &mesh, &source);

        let expected = source.projection_matrix() * source.view_matrix() * mesh.world;
        let params = &generated(&generator, &pass).vertex_params;
        assert_eq!(
            params.named_constant("worldviewproj_matrix"),
            Some(&expected.to_cols_array()[..])
        );
    }
}

#[test]
fn constant_buffer_size_is_stable_across_draws() {
    let mut generator = generator();
    let mut pass = Pass::new("brick").with_texture_unit(unit(1));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    let before = generated(&generator, &pass).vertex_params.as_bytes().len();

    let mesh = Mesh { world: Mat4::IDENTITY };
    for _ in 0..3 {
        draw(&generator, &mut pass, &mesh, &camera());
    }

    let after = &generated(&generator, &pass).vertex_params;
    assert_eq!(after.as_bytes().len(), before);
    assert_eq!(after.constant_count(), 1);
}

#[test]
fn texture_matrix_of_animated_unit() {
    let mut generator = generator();
    let mut scrolled = unit(1);
    scrolled.add_effect(TextureEffect::UScroll(0.25));
    let mut pass = Pass::new("water").with_texture_unit(scrolled);
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let scroll = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
    let mut source = camera();
    source.set_texture_matrix(0, scroll);
    draw(&generator, &mut pass, &Mesh { world: Mat4::IDENTITY }, &source);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(params.named_constant("texture_matrix"), Some(&scroll.to_cols_array()[..]));
}

// ============================================================================
// Alpha Rejection
// ============================================================================

#[test]
fn alpha_reject_values_follow_the_pass() {
    let mut generator = generator();
    let mut pass = Pass::new("foliage")
        .with_texture_unit(unit(1))
        .with_alpha_reject(CompareFunction::GreaterEqual, 255);
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    let mesh = Mesh { world: Mat4::IDENTITY };

    draw(&generator, &mut pass, &mesh, &camera());
    let params = &generated(&generator, &pass).fragment_params;
    assert_eq!(
        params.named_constant("gAlphaFunc0"),
        Some(&[CompareFunction::GreaterEqual.shader_code()][..])
    );
    assert_eq!(params.named_constant("surface_alpha_rejection_value"), Some(&[1.0][..]));

    pass.alpha_reject.function = CompareFunction::Less;
    pass.alpha_reject.value = 0;
    draw(&generator, &mut pass, &mesh, &camera());
    let params = &generated(&generator, &pass).fragment_params;
    assert_eq!(
        params.named_constant("gAlphaFunc0"),
        Some(&[CompareFunction::Less.shader_code()][..])
    );
    assert_eq!(params.named_constant("surface_alpha_rejection_value"), Some(&[0.0][..]));
}

// ============================================================================
// Projective Texturing
// ============================================================================

#[test]
fn projector_matrix_is_pushed_per_draw() {
    let mut generator = generator();
    let mut projected = unit(1);
    projected.add_effect(TextureEffect::ProjectiveTexture(Some(Projector::default())));
    let mut pass = Pass::new("spotlight").with_texture_unit(projected);
    let outcome = generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();
    assert!(outcome.is_generated());

    let projector = Projector {
        view: Mat4::look_at_rh(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Z),
        projection: Mat4::perspective_rh(0.8, 1.0, 1.0, 50.0),
    };
    pass.texture_units[0].set_projector(projector);
    draw(&generator, &mut pass, &Mesh { world: Mat4::IDENTITY }, &camera());

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(
        params.named_constant("gTexViewProjImageMatrix0"),
        Some(&projector.view_proj_image_matrix().to_cols_array()[..])
    );
}

// ============================================================================
// Passes Without Generated State
// ============================================================================

// ============================================================================
// Lighting
// ============================================================================

/// Identity view so view-space values equal world-space ones.
fn world_camera() -> AutoParamDataSource {
    let mut source = AutoParamDataSource::new();
    source.set_camera(Mat4::IDENTITY, Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0));
    source
}

fn lit_pass(name: &str, count: LightCount) -> Pass {
    let surface = SurfaceColours {
        diffuse: Vec4::new(0.5, 0.5, 0.5, 1.0),
        ..Default::default()
    };
    Pass::new(name).with_lighting(surface).with_light_count(count)
}

fn draw_lit(generator: &ShaderGenerator, pass: &mut Pass, source: &AutoParamDataSource, lights: &[Light]) {
    let mesh = Mesh { world: Mat4::IDENTITY };
    generator.notify_render_single_object(&mesh, pass, DEFAULT_SCHEME_NAME, source, lights);
}

#[test]
fn directional_light_is_pushed_in_view_space() {
    let mut generator = generator();
    let mut pass = lit_pass("sunlit", LightCount::new(0, 1, 0));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let sun_colour = Vec4::new(1.0, 0.8, 0.6, 1.0);
    let sun = Light::directional(Vec3::NEG_Y, sun_colour);
    draw_lit(&generator, &mut pass, &world_camera(), &[sun]);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(
        params.named_constant("gLightDirectionView0"),
        Some(&[0.0, 1.0, 0.0, 0.0][..])
    );
    let expected = sun_colour * Vec4::new(0.5, 0.5, 0.5, 1.0);
    assert_eq!(params.named_constant("gLightDiffuse0"), Some(&expected.to_array()[..]));
}

#[test]
fn derived_scene_colour_uses_ambient_light() {
    let mut generator = generator();
    let mut pass = lit_pass("ambient", LightCount::new(0, 1, 0));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let mut source = world_camera();
    source.set_ambient_light(Vec4::new(0.25, 0.5, 1.0, 1.0));
    draw_lit(&generator, &mut pass, &source, &[]);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(
        params.named_constant("derived_scene_colour"),
        Some(&[0.25, 0.5, 1.0, 1.0][..])
    );
}

#[test]
fn lights_are_matched_by_kind() {
    let mut generator = generator();
    let mut pass = lit_pass("street", LightCount::new(1, 1, 0));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let lamp = Light::point(Vec3::new(2.0, 3.0, 4.0), Vec4::ONE).with_attenuation(50.0, 1.0, 0.5, 0.0);
    let sun = Light::directional(Vec3::NEG_Z, Vec4::ONE);
    draw_lit(&generator, &mut pass, &world_camera(), &[sun, lamp]);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(
        params.named_constant("gLightPositionView0"),
        Some(&[2.0, 3.0, 4.0, 1.0][..])
    );
    assert_eq!(
        params.named_constant("gLightAttenuation0"),
        Some(&[50.0, 1.0, 0.5, 0.0][..])
    );
    assert_eq!(
        params.named_constant("gLightDirectionView1"),
        Some(&[0.0, 0.0, 1.0, 0.0][..])
    );
}

#[test]
fn missing_lights_contribute_nothing() {
    let mut generator = generator();
    let mut pass = lit_pass("dark", LightCount::new(1, 1, 0));
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let sun = Light::directional(Vec3::NEG_Y, Vec4::ONE);
    draw_lit(&generator, &mut pass, &world_camera(), &[sun]);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(params.named_constant("gLightDiffuse0"), Some(&[0.0; 4][..]));
    assert_eq!(
        params.named_constant("gLightAttenuation0"),
        Some(&[0.0, 1.0, 0.0, 0.0][..])
    );
    assert_eq!(
        params.named_constant("gLightDiffuse1"),
        Some(&[0.5, 0.5, 0.5, 1.0][..])
    );
}

#[test]
fn specular_colour_is_scaled_by_the_surface() {
    let mut generator = generator();
    let surface = SurfaceColours {
        specular: Vec4::new(0.5, 0.5, 0.5, 1.0),
        shininess: 16.0,
        ..Default::default()
    };
    let mut pass = Pass::new("glossy").with_lighting(surface);
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    let sun = Light::directional(Vec3::NEG_Y, Vec4::ONE).with_specular(Vec4::new(1.0, 0.5, 0.0, 1.0));
    draw_lit(&generator, &mut pass, &world_camera(), &[sun]);

    let params = &generated(&generator, &pass).vertex_params;
    assert_eq!(
        params.named_constant("gLightSpecular0"),
        Some(&[0.5, 0.25, 0.0, 1.0][..])
    );
    assert_eq!(params.named_constant("surface_shininess"), Some(&[16.0][..]));
}

#[test]
fn untouched_pass_is_ignored() {
    let generator = generator();
    let mut pass = Pass::new("legacy").with_texture_unit(unit(1));

    draw(&generator, &mut pass, &Mesh { world: Mat4::IDENTITY }, &camera());
    assert!(generator.generated_pass(&pass, DEFAULT_SCHEME_NAME).is_none());
}

#[test]
fn other_schemes_are_not_updated() {
    let mut generator = generator();
    let mut pass = Pass::new("foliage").with_alpha_reject(CompareFunction::Greater, 10);
    generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0).unwrap();

    generator.notify_render_single_object(
        &Mesh { world: Mat4::IDENTITY },
        &mut pass,
        "shadow",
        &camera(),
        &[],
    );
    let params = &generated(&generator, &pass).fragment_params;
    assert_eq!(params.named_constant("gAlphaFunc0"), Some(&[0.0][..]));
}
