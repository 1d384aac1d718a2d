//! Fixed-function emulation.
//!
//! Sub-render-states reproducing the classic fixed-function pipeline:
//! vertex transform, colour setup, per-vertex lighting, per-unit texturing
//! and alpha rejection.
//! They share the group orders below, which fix where each feature's atoms
//! land in the generated `main()`.

use loom_core::ResolveError;
use loom_shader::{ParamId, Program, Semantic};

pub mod alpha_test;
pub mod colour;
pub mod lighting;
pub mod texture_stage;
pub mod transform;

// ─── Type Names ──────────────────────────────────────────────────────────────

pub const TRANSFORM_TYPE: &str = "FFP_Transform";
pub const COLOUR_TYPE: &str = "FFP_Colour";
pub const LIGHTING_TYPE: &str = "FFP_Lighting";
pub const TEXTURE_STAGE_TYPE: &str = "FFP_TextureUnitState";
pub const ALPHA_TEST_TYPE: &str = "FFP_AlphaTest";

// ─── Execution Orders ────────────────────────────────────────────────────────

pub const FFP_TRANSFORM: i32 = 100;
pub const FFP_COLOUR: i32 = 200;
pub const FFP_LIGHTING: i32 = 300;
pub const FFP_TEXTURING: i32 = 400;
pub const FFP_ALPHA_TEST: i32 = 1000;

// ─── Group Orders ────────────────────────────────────────────────────────────

pub const FFP_VS_TRANSFORM: i32 = 100;
pub const FFP_VS_COLOUR: i32 = 200;
pub const FFP_VS_LIGHTING: i32 = 300;
pub const FFP_VS_TEXTURING: i32 = 400;

pub const FFP_PS_COLOUR_BEGIN: i32 = 100;
/// Texture unit `n` emits at `FFP_PS_TEXTURING + 100 * n`.
pub const FFP_PS_TEXTURING: i32 = 1000;
pub const FFP_PS_COLOUR_END: i32 = 3000;
pub const FFP_PS_ALPHA_TEST: i32 = 4000;

/// Texture units that fit between [`FFP_PS_TEXTURING`] and [`FFP_PS_COLOUR_END`].
pub const MAX_TEXTURE_STAGES: u32 = ((FFP_PS_COLOUR_END - FFP_PS_TEXTURING) / 100) as u32;

/// Light slots a lit pass may declare.
pub const MAX_LIGHTS: u32 = 8;

// ─── Libraries ───────────────────────────────────────────────────────────────

pub const FFP_LIB_COMMON: &str = "FFPLib_Common";
pub const FFP_LIB_TRANSFORM: &str = "FFPLib_Transform";
pub const FFP_LIB_LIGHTING: &str = "FFPLib_Lighting";
pub const FFP_LIB_TEXTURING: &str = "FFPLib_Texturing";
pub const FFP_LIB_ALPHA_TEST: &str = "FFPLib_AlphaTest";

// ─── Library Functions ───────────────────────────────────────────────────────

pub const FFP_FUNC_TRANSFORM: &str = "FFP_Transform";
pub const FFP_FUNC_ASSIGN: &str = "FFP_Assign";
pub const FFP_FUNC_CONSTRUCT: &str = "FFP_Construct";
pub const FFP_FUNC_MODULATE: &str = "FFP_Modulate";
pub const FFP_FUNC_MODULATE_X2: &str = "FFP_ModulateX2";
pub const FFP_FUNC_MODULATE_X4: &str = "FFP_ModulateX4";
pub const FFP_FUNC_ADD: &str = "FFP_Add";
pub const FFP_FUNC_ADD_SIGNED: &str = "FFP_AddSigned";
pub const FFP_FUNC_ADD_SMOOTH: &str = "FFP_AddSmooth";
pub const FFP_FUNC_SUBTRACT: &str = "FFP_Subtract";
pub const FFP_FUNC_LERP: &str = "FFP_Lerp";
pub const FFP_FUNC_DOT_PRODUCT: &str = "FFP_DotProduct";
pub const FFP_FUNC_TRANSFORM_TEXCOORD: &str = "FFP_TransformTexCoord";
pub const FFP_FUNC_GENERATE_TEXCOORD_ENV_SPHERE: &str = "FFP_GenerateTexCoord_EnvMap_Sphere";
pub const FFP_FUNC_GENERATE_TEXCOORD_ENV_REFLECT: &str = "FFP_GenerateTexCoord_EnvMap_Reflect";
pub const FFP_FUNC_GENERATE_TEXCOORD_ENV_NORMAL: &str = "FFP_GenerateTexCoord_EnvMap_Normal";
pub const FFP_FUNC_GENERATE_TEXCOORD_PROJECTION: &str = "FFP_GenerateTexCoord_Projection";
pub const FFP_FUNC_SAMPLE_TEXTURE: &str = "FFP_SampleTexture";
pub const FFP_FUNC_SAMPLE_TEXTURE_PROJ: &str = "FFP_SampleTextureProj";
pub const FFP_FUNC_ALPHA_TEST: &str = "FFP_Alpha_Test";
pub const FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE: &str = "FFP_Light_Directional_Diffuse";
pub const FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE_SPECULAR: &str = "FFP_Light_Directional_DiffuseSpecular";
pub const FFP_FUNC_LIGHT_POINT_DIFFUSE: &str = "FFP_Light_Point_Diffuse";
pub const FFP_FUNC_LIGHT_POINT_DIFFUSE_SPECULAR: &str = "FFP_Light_Point_DiffuseSpecular";
pub const FFP_FUNC_LIGHT_SPOT_DIFFUSE: &str = "FFP_Light_Spot_Diffuse";
pub const FFP_FUNC_LIGHT_SPOT_DIFFUSE_SPECULAR: &str = "FFP_Light_Spot_DiffuseSpecular";

/// Unwraps a parameter handle captured during `resolve_parameters`.
pub(crate) fn resolved(id: Option<ParamId>, sub_state: &'static str) -> Result<ParamId, ResolveError> {
    id.ok_or(ResolveError::NotResolved(sub_state))
}

/// A parameter an earlier sub-state must have provided.
pub(crate) fn missing(program: &Program, usage: &'static str, semantic: Semantic, index: u32) -> ResolveError {
    ResolveError::MissingParameter {
        program: program.program_type().as_str(),
        usage,
        semantic: semantic.as_str(),
        index,
    }
}
