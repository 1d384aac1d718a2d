//! Fixed-function texture stage.
//!
//! One instance per texture unit of a pass. The vertex program computes the
//! unit's texture coordinates, either passing an authored UV set through
//! (optionally transformed by the texture matrix) or generating them from an
//! environment map or projector. The fragment program samples the texture
//! and blends it into the output colour:
//!
//! ```text
//! texel   = sample(gTextureSampler<n>, uv)
//! source1 = argument(colour.source1)    only if the operation reads it
//! source2 = argument(colour.source2)    only if the operation reads it
//! out     = blend(colour.operation, source1, source2)
//! ```
//!
//! When the alpha blend uses a different operation or different sources, the
//! colour blend writes `.xyz` only and a second argument and blend sequence
//! writes `.w`.

use std::any::Any;

use loom_core::{ConfigError, HashFolder, ResolveError};
use loom_material::{
    BindingType, EnvMapType, LayerBlendModeEx, LayerBlendOperationEx, LayerBlendSource, LayerBlendType,
    Pass, TextureEffect, TextureType, TextureUnitState,
};
use loom_shader::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, Operand, OperandMask, ParamId, Program,
    ProgramSet, Semantic,
};

use super::{
    FFP_FUNC_ADD, FFP_FUNC_ADD_SIGNED, FFP_FUNC_ADD_SMOOTH, FFP_FUNC_ASSIGN, FFP_FUNC_CONSTRUCT,
    FFP_FUNC_DOT_PRODUCT, FFP_FUNC_GENERATE_TEXCOORD_ENV_NORMAL, FFP_FUNC_GENERATE_TEXCOORD_ENV_REFLECT,
    FFP_FUNC_GENERATE_TEXCOORD_ENV_SPHERE, FFP_FUNC_GENERATE_TEXCOORD_PROJECTION, FFP_FUNC_LERP,
    FFP_FUNC_MODULATE, FFP_FUNC_MODULATE_X2, FFP_FUNC_MODULATE_X4, FFP_FUNC_SAMPLE_TEXTURE,
    FFP_FUNC_SAMPLE_TEXTURE_PROJ, FFP_FUNC_SUBTRACT, FFP_FUNC_TRANSFORM_TEXCOORD, FFP_LIB_COMMON,
    FFP_LIB_TEXTURING, FFP_PS_TEXTURING, FFP_TEXTURING, FFP_VS_TEXTURING, MAX_TEXTURE_STAGES,
    TEXTURE_STAGE_TYPE, missing,
    resolved,
};
use crate::sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, UpdateContext, base_hash, downcast_sub_state,
};

const TEX_VIEW_PROJ_IMAGE_NAME: &str = "gTexViewProjImageMatrix";

/// How the vertex program produces a unit's texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexCoordCalcMethod {
    /// Authored UV set, optionally transformed by the texture matrix.
    #[default]
    None,
    /// Sphere map from the view-space normal.
    EnvironmentMap,
    EnvironmentMapPlanar,
    EnvironmentMapReflection,
    EnvironmentMapNormal,
    ProjectiveTexture,
}

impl TexCoordCalcMethod {
    /// Picks the method for `unit`. The first environment map effect wins;
    /// a projective effect overrides any environment map.
    #[must_use]
    pub fn for_unit(unit: &TextureUnitState) -> Self {
        let mut method = Self::None;
        for effect in unit.effects() {
            match effect {
                TextureEffect::ProjectiveTexture(_) => return Self::ProjectiveTexture,
                TextureEffect::EnvironmentMap(kind) if method == Self::None => {
                    method = match kind {
                        EnvMapType::Curved => Self::EnvironmentMap,
                        EnvMapType::Planar => Self::EnvironmentMapPlanar,
                        EnvMapType::Reflection => Self::EnvironmentMapReflection,
                        EnvMapType::Normal => Self::EnvironmentMapNormal,
                    };
                }
                _ => {}
            }
        }
        method
    }
}

/// True if the unit animates or statically transforms its coordinates.
#[must_use]
pub fn needs_texture_matrix(unit: &TextureUnitState) -> bool {
    unit.effects().iter().any(|effect| {
        matches!(
            effect,
            TextureEffect::UvScroll { .. }
                | TextureEffect::UScroll(_)
                | TextureEffect::VScroll(_)
                | TextureEffect::Rotate(_)
                | TextureEffect::Transform { .. }
        )
    }) || unit.texture_transform != glam::Mat4::IDENTITY
}

const fn sampler_type(texture_type: TextureType) -> GpuConstantType {
    match texture_type {
        TextureType::Tex1D => GpuConstantType::Sampler1D,
        TextureType::Tex2D => GpuConstantType::Sampler2D,
        TextureType::Tex3D => GpuConstantType::Sampler3D,
        TextureType::CubeMap => GpuConstantType::SamplerCube,
    }
}

const fn texcoord_type(texture_type: TextureType) -> GpuConstantType {
    match texture_type {
        TextureType::Tex1D => GpuConstantType::Float1,
        TextureType::Tex2D => GpuConstantType::Float2,
        TextureType::Tex3D | TextureType::CubeMap => GpuConstantType::Float3,
    }
}

/// Type of the interpolated coordinates handed to the fragment program.
const fn output_texcoord_type(method: TexCoordCalcMethod, texture_type: TextureType) -> GpuConstantType {
    match method {
        TexCoordCalcMethod::None => texcoord_type(texture_type),
        TexCoordCalcMethod::EnvironmentMap | TexCoordCalcMethod::EnvironmentMapPlanar => {
            GpuConstantType::Float2
        }
        TexCoordCalcMethod::EnvironmentMapReflection
        | TexCoordCalcMethod::EnvironmentMapNormal
        | TexCoordCalcMethod::ProjectiveTexture => GpuConstantType::Float3,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct StageParameters {
    // vertex program
    texture_matrix: Option<ParamId>,
    world: Option<ParamId>,
    world_it: Option<ParamId>,
    view: Option<ParamId>,
    view_it: Option<ParamId>,
    tex_view_proj_image: Option<ParamId>,
    vs_normal: Option<ParamId>,
    vs_position: Option<ParamId>,
    vs_texcoord_in: Option<ParamId>,
    vs_texcoord_out: Option<ParamId>,
    // fragment program
    sampler: Option<ParamId>,
    ps_texcoord_in: Option<ParamId>,
    ps_diffuse: Option<ParamId>,
    ps_specular: Option<ParamId>,
    ps_colour_out: Option<ParamId>,
    texel: Option<ParamId>,
    source1: Option<ParamId>,
    source2: Option<ParamId>,
}

/// Handles of the fragment parameters the argument and blend atoms read.
#[derive(Clone, Copy)]
struct FragmentInputs {
    group: i32,
    first_stage: bool,
    diffuse: ParamId,
    specular: ParamId,
    colour_out: ParamId,
    texel: ParamId,
    source1: ParamId,
    source2: ParamId,
}

#[derive(Debug, Default)]
pub struct FfpTextureStage {
    sampler_index: u32,
    unit: Option<TextureUnitState>,
    params: StageParameters,
}

impl FfpTextureStage {
    /// A stage for texture unit `sampler_index` configured from `unit`.
    pub fn new(sampler_index: u32, unit: TextureUnitState) -> Result<Self, ConfigError> {
        let mut stage = Self::default();
        stage.set_texture_unit(sampler_index, unit)?;
        Ok(stage)
    }

    /// Replaces the captured texture unit state. Vertex texture fetch is not
    /// available to fixed-function texturing.
    pub fn set_texture_unit(&mut self, sampler_index: u32, unit: TextureUnitState) -> Result<(), ConfigError> {
        if unit.binding_type == BindingType::Vertex {
            return Err(ConfigError::UnsupportedBinding {
                unit: sampler_index,
                reason: "fixed-function texturing does not support vertex texture fetch",
            });
        }
        self.sampler_index = sampler_index;
        self.unit = Some(unit);
        self.params = StageParameters::default();
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn sampler_index(&self) -> u32 {
        self.sampler_index
    }

    #[must_use]
    pub fn texture_unit(&self) -> Option<&TextureUnitState> {
        self.unit.as_ref()
    }

    #[must_use]
    pub fn calc_method(&self) -> TexCoordCalcMethod {
        self.unit.as_ref().map_or(TexCoordCalcMethod::None, TexCoordCalcMethod::for_unit)
    }

    fn unit(&self) -> Result<&TextureUnitState, ResolveError> {
        self.unit.as_ref().ok_or(ResolveError::NotResolved(TEXTURE_STAGE_TYPE))
    }

    fn resolve_uniforms(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let unit = self.unit()?;
        let index = self.sampler_index;
        let method = TexCoordCalcMethod::for_unit(unit);
        let texture_matrix = needs_texture_matrix(unit);
        let texture_type = unit.texture_type;
        if method == TexCoordCalcMethod::ProjectiveTexture
            && !unit
                .effects()
                .iter()
                .any(|effect| matches!(effect, TextureEffect::ProjectiveTexture(Some(_))))
        {
            return Err(ResolveError::MissingProjector { unit: index });
        }

        let (vs, ps) = programs.split_mut();
        let params = &mut self.params;
        params.sampler = Some(ps.resolve_parameter(sampler_type(texture_type), Some(index), "gTextureSampler")?);

        if texture_matrix {
            params.texture_matrix = Some(vs.resolve_auto_parameter(AutoConstantType::TextureMatrix, index));
        }

        match method {
            TexCoordCalcMethod::None => {}
            TexCoordCalcMethod::EnvironmentMap
            | TexCoordCalcMethod::EnvironmentMapPlanar
            | TexCoordCalcMethod::EnvironmentMapNormal => {
                params.world_it = Some(vs.resolve_auto_parameter(AutoConstantType::InverseTransposeWorldMatrix, 0));
                params.view = Some(vs.resolve_auto_parameter(AutoConstantType::ViewMatrix, 0));
            }
            TexCoordCalcMethod::EnvironmentMapReflection => {
                params.world = Some(vs.resolve_auto_parameter(AutoConstantType::WorldMatrix, 0));
                params.world_it = Some(vs.resolve_auto_parameter(AutoConstantType::InverseTransposeWorldMatrix, 0));
                params.view = Some(vs.resolve_auto_parameter(AutoConstantType::ViewMatrix, 0));
                params.view_it = Some(vs.resolve_auto_parameter(AutoConstantType::InverseTransposeViewMatrix, 0));
            }
            TexCoordCalcMethod::ProjectiveTexture => {
                params.world = Some(vs.resolve_auto_parameter(AutoConstantType::WorldMatrix, 0));
                params.tex_view_proj_image = Some(vs.resolve_parameter(
                    GpuConstantType::Matrix4x4,
                    Some(index),
                    TEX_VIEW_PROJ_IMAGE_NAME,
                )?);
            }
        }
        Ok(())
    }

    fn resolve_function_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let unit = self.unit()?;
        let index = self.sampler_index;
        let method = TexCoordCalcMethod::for_unit(unit);
        let texture_type = unit.texture_type;
        let tex_coord_set = unit.tex_coord_set();
        let out_type = output_texcoord_type(method, texture_type);

        let (vs, ps) = programs.split_mut();
        let params = &mut self.params;

        match method {
            TexCoordCalcMethod::None => {
                params.vs_texcoord_in = Some(vs.resolve_input_parameter(
                    Semantic::TextureCoordinates,
                    tex_coord_set,
                    Content::TextureCoordinate(tex_coord_set),
                    texcoord_type(texture_type),
                )?);
            }
            TexCoordCalcMethod::EnvironmentMap
            | TexCoordCalcMethod::EnvironmentMapPlanar
            | TexCoordCalcMethod::EnvironmentMapNormal => {
                params.vs_normal = Some(vs.resolve_input_parameter(
                    Semantic::Normal,
                    0,
                    Content::NormalObjectSpace,
                    GpuConstantType::Float3,
                )?);
            }
            TexCoordCalcMethod::EnvironmentMapReflection => {
                params.vs_normal = Some(vs.resolve_input_parameter(
                    Semantic::Normal,
                    0,
                    Content::NormalObjectSpace,
                    GpuConstantType::Float3,
                )?);
                params.vs_position = Some(vs.resolve_input_parameter(
                    Semantic::Position,
                    0,
                    Content::PositionObjectSpace,
                    GpuConstantType::Float4,
                )?);
            }
            TexCoordCalcMethod::ProjectiveTexture => {
                params.vs_position = Some(vs.resolve_input_parameter(
                    Semantic::Position,
                    0,
                    Content::PositionObjectSpace,
                    GpuConstantType::Float4,
                )?);
            }
        }

        // Keyed by sampler index so re-resolution finds the same interpolant.
        let texcoord_out = vs.resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(index),
            out_type,
        )?;
        params.vs_texcoord_out = Some(texcoord_out);
        params.ps_texcoord_in = Some(ps.resolve_input_parameter(
            Semantic::TextureCoordinates,
            vs.parameter(texcoord_out).index(),
            Content::TextureCoordinate(index),
            out_type,
        )?);

        params.ps_diffuse = Some(
            ps.find_input(Semantic::Color, 0)
                .or_else(|| ps.find_local(Semantic::Color, 0))
                .ok_or_else(|| missing(ps, "input or local", Semantic::Color, 0))?,
        );
        params.ps_specular = Some(
            ps.find_input(Semantic::Color, 1)
                .or_else(|| ps.find_local(Semantic::Color, 1))
                .ok_or_else(|| missing(ps, "input or local", Semantic::Color, 1))?,
        );
        params.ps_colour_out = Some(ps.resolve_output_parameter(
            Semantic::Color,
            Some(0),
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);

        params.texel = Some(ps.resolve_local_parameter(Semantic::Unknown, 0, "texel", GpuConstantType::Float4)?);
        params.source1 = Some(ps.resolve_local_parameter(Semantic::Unknown, 0, "source1", GpuConstantType::Float4)?);
        params.source2 = Some(ps.resolve_local_parameter(Semantic::Unknown, 0, "source2", GpuConstantType::Float4)?);
        Ok(())
    }

    fn add_vs_invocations(&self, vs: &mut Program) -> Result<(), ResolveError> {
        let unit = self.unit()?;
        let p = &self.params;
        let matrix = p
            .texture_matrix
            .map(|id| vs.op_in(id));
        let out = vs.op_out(resolved(p.vs_texcoord_out, TEXTURE_STAGE_TYPE)?);
        let input = |id: Option<ParamId>| resolved(id, TEXTURE_STAGE_TYPE).map(|id| vs.op_in(id));

        let (function, operands): (&str, Vec<Operand>) = match TexCoordCalcMethod::for_unit(unit) {
            TexCoordCalcMethod::None => {
                let texcoord = input(p.vs_texcoord_in)?;
                match matrix {
                    Some(matrix) => (FFP_FUNC_TRANSFORM_TEXCOORD, vec![matrix, texcoord, out]),
                    None => (FFP_FUNC_ASSIGN, vec![texcoord, out]),
                }
            }
            TexCoordCalcMethod::EnvironmentMap | TexCoordCalcMethod::EnvironmentMapPlanar => {
                let mut operands = vec![input(p.world_it)?, input(p.view)?];
                operands.extend(matrix);
                operands.extend([input(p.vs_normal)?, out]);
                (FFP_FUNC_GENERATE_TEXCOORD_ENV_SPHERE, operands)
            }
            TexCoordCalcMethod::EnvironmentMapReflection => {
                let mut operands = vec![
                    input(p.world)?,
                    input(p.world_it)?,
                    input(p.view)?,
                    input(p.view_it)?,
                ];
                operands.extend(matrix);
                operands.extend([input(p.vs_normal)?, input(p.vs_position)?, out]);
                (FFP_FUNC_GENERATE_TEXCOORD_ENV_REFLECT, operands)
            }
            TexCoordCalcMethod::EnvironmentMapNormal => {
                let mut operands = vec![input(p.world_it)?, input(p.view)?];
                operands.extend(matrix);
                operands.extend([input(p.vs_normal)?, out]);
                (FFP_FUNC_GENERATE_TEXCOORD_ENV_NORMAL, operands)
            }
            TexCoordCalcMethod::ProjectiveTexture => (
                FFP_FUNC_GENERATE_TEXCOORD_PROJECTION,
                vec![
                    input(p.world)?,
                    input(p.tex_view_proj_image)?,
                    input(p.vs_position)?,
                    out,
                ],
            ),
        };

        // One shared group for every unit, ordered by sampler index.
        vs.add_invocation(
            FunctionInvocation::new(function, FFP_VS_TEXTURING, self.sampler_index).with_operands(operands),
        );
        Ok(())
    }

    fn add_ps_invocations(&self, ps: &mut Program) -> Result<(), ResolveError> {
        let unit = self.unit()?;
        let p = &self.params;
        let inputs = FragmentInputs {
            group: FFP_PS_TEXTURING + 100 * self.sampler_index as i32,
            first_stage: self.sampler_index == 0,
            diffuse: resolved(p.ps_diffuse, TEXTURE_STAGE_TYPE)?,
            specular: resolved(p.ps_specular, TEXTURE_STAGE_TYPE)?,
            colour_out: resolved(p.ps_colour_out, TEXTURE_STAGE_TYPE)?,
            texel: resolved(p.texel, TEXTURE_STAGE_TYPE)?,
            source1: resolved(p.source1, TEXTURE_STAGE_TYPE)?,
            source2: resolved(p.source2, TEXTURE_STAGE_TYPE)?,
        };

        let sample = if TexCoordCalcMethod::for_unit(unit) == TexCoordCalcMethod::ProjectiveTexture {
            FFP_FUNC_SAMPLE_TEXTURE_PROJ
        } else {
            FFP_FUNC_SAMPLE_TEXTURE
        };
        let operands = [
            ps.op_in(resolved(p.sampler, TEXTURE_STAGE_TYPE)?),
            ps.op_in(resolved(p.ps_texcoord_in, TEXTURE_STAGE_TYPE)?),
            ps.op_out(inputs.texel),
        ];
        ps.stage(inputs.group).call(sample, operands);

        let colour = &unit.colour_blend;
        let alpha = &unit.alpha_blend;
        if alpha.differs_in_structure(colour) {
            add_blend_sequence(ps, &inputs, colour, OperandMask::XYZ);
            add_blend_sequence(ps, &inputs, alpha, OperandMask::W);
        } else {
            add_blend_sequence(ps, &inputs, colour, OperandMask::ALL);
        }
        Ok(())
    }
}

/// Alpha arguments fill `.w` only; colour arguments fill the whole vector.
const fn argument_mask(mode: &LayerBlendModeEx) -> OperandMask {
    match mode.blend_type {
        LayerBlendType::Colour => OperandMask::ALL,
        LayerBlendType::Alpha => OperandMask::W,
    }
}

/// Emits the argument atoms the operation reads, then the blend atom
/// restricted to `target`.
fn add_blend_sequence(ps: &mut Program, inputs: &FragmentInputs, mode: &LayerBlendModeEx, target: OperandMask) {
    if mode.operation.reads_source1() {
        add_argument(ps, inputs, mode, inputs.source1, mode.source1, mode.colour_arg1, mode.alpha_arg1);
    }
    if mode.operation.reads_source2() {
        add_argument(ps, inputs, mode, inputs.source2, mode.source2, mode.colour_arg2, mode.alpha_arg2);
    }
    add_blend(ps, inputs, mode, target);
}

fn add_argument(
    ps: &mut Program,
    inputs: &FragmentInputs,
    mode: &LayerBlendModeEx,
    arg: ParamId,
    source: LayerBlendSource,
    colour_value: glam::Vec4,
    alpha_value: f32,
) {
    let mask = argument_mask(mode);
    let dst = ps.op_out(arg).with_mask(mask);
    let from = |id: ParamId| ps.op_in(id).with_mask(mask);

    let (function, operands) = match source {
        LayerBlendSource::Current => {
            let current = if inputs.first_stage {
                inputs.diffuse
            } else {
                inputs.colour_out
            };
            (FFP_FUNC_ASSIGN, vec![from(current), dst])
        }
        LayerBlendSource::Texture => (FFP_FUNC_ASSIGN, vec![from(inputs.texel), dst]),
        LayerBlendSource::Diffuse => (FFP_FUNC_ASSIGN, vec![from(inputs.diffuse), dst]),
        LayerBlendSource::Specular => (FFP_FUNC_ASSIGN, vec![from(inputs.specular), dst]),
        LayerBlendSource::Manual => match mode.blend_type {
            LayerBlendType::Colour => (
                FFP_FUNC_CONSTRUCT,
                vec![
                    Operand::literal(colour_value.x),
                    Operand::literal(colour_value.y),
                    Operand::literal(colour_value.z),
                    Operand::literal(colour_value.w),
                    dst,
                ],
            ),
            LayerBlendType::Alpha => (FFP_FUNC_ASSIGN, vec![Operand::literal(alpha_value), dst]),
        },
    };
    ps.stage(inputs.group).call(function, operands);
}

fn add_blend(ps: &mut Program, inputs: &FragmentInputs, mode: &LayerBlendModeEx, mask: OperandMask) {
    let arg1 = ps.op_in(inputs.source1).with_mask(mask);
    let arg2 = ps.op_in(inputs.source2).with_mask(mask);
    let out = ps.op_out(inputs.colour_out).with_mask(mask);
    let alpha_of = |id: ParamId| ps.op_in(id).with_mask(OperandMask::W);

    let (function, operands) = match mode.operation {
        LayerBlendOperationEx::Source1 => (FFP_FUNC_ASSIGN, vec![arg1, out]),
        LayerBlendOperationEx::Source2 => (FFP_FUNC_ASSIGN, vec![arg2, out]),
        LayerBlendOperationEx::Modulate => (FFP_FUNC_MODULATE, vec![arg1, arg2, out]),
        LayerBlendOperationEx::ModulateX2 => (FFP_FUNC_MODULATE_X2, vec![arg1, arg2, out]),
        LayerBlendOperationEx::ModulateX4 => (FFP_FUNC_MODULATE_X4, vec![arg1, arg2, out]),
        LayerBlendOperationEx::Add => (FFP_FUNC_ADD, vec![arg1, arg2, out]),
        LayerBlendOperationEx::AddSigned => (FFP_FUNC_ADD_SIGNED, vec![arg1, arg2, out]),
        LayerBlendOperationEx::AddSmooth => (FFP_FUNC_ADD_SMOOTH, vec![arg1, arg2, out]),
        LayerBlendOperationEx::Subtract => (FFP_FUNC_SUBTRACT, vec![arg1, arg2, out]),
        LayerBlendOperationEx::BlendDiffuseAlpha => {
            (FFP_FUNC_LERP, vec![arg2, arg1, alpha_of(inputs.diffuse), out])
        }
        LayerBlendOperationEx::BlendTextureAlpha => {
            (FFP_FUNC_LERP, vec![arg2, arg1, alpha_of(inputs.texel), out])
        }
        LayerBlendOperationEx::BlendCurrentAlpha => {
            let current = if inputs.first_stage {
                inputs.diffuse
            } else {
                inputs.colour_out
            };
            (FFP_FUNC_LERP, vec![arg2, arg1, alpha_of(current), out])
        }
        LayerBlendOperationEx::BlendManual => {
            (FFP_FUNC_LERP, vec![arg2, arg1, Operand::literal(mode.factor), out])
        }
        LayerBlendOperationEx::DotProduct => (FFP_FUNC_DOT_PRODUCT, vec![arg2, arg1, out]),
        LayerBlendOperationEx::BlendDiffuseColour => {
            let factor = ps.op_in(inputs.diffuse).with_mask(mask);
            (FFP_FUNC_LERP, vec![arg2, arg1, factor, out])
        }
    };
    ps.stage(inputs.group).call(function, operands);
}

fn fold_blend_mode(folder: &mut HashFolder, mode: &LayerBlendModeEx) {
    folder.fold(&mode.operation).fold(&mode.source1).fold(&mode.source2);
    match mode.blend_type {
        LayerBlendType::Colour => {
            if mode.source1 == LayerBlendSource::Manual {
                for value in mode.colour_arg1.to_array() {
                    folder.fold_f32(value);
                }
            }
            if mode.source2 == LayerBlendSource::Manual {
                for value in mode.colour_arg2.to_array() {
                    folder.fold_f32(value);
                }
            }
        }
        LayerBlendType::Alpha => {
            if mode.source1 == LayerBlendSource::Manual {
                folder.fold_f32(mode.alpha_arg1);
            }
            if mode.source2 == LayerBlendSource::Manual {
                folder.fold_f32(mode.alpha_arg2);
            }
        }
    }
    if mode.operation == LayerBlendOperationEx::BlendManual {
        folder.fold_f32(mode.factor);
    }
}

impl SubRenderState for FfpTextureStage {
    fn type_name(&self) -> &'static str {
        TEXTURE_STAGE_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_TEXTURING + 100 * self.sampler_index as i32
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        let count = ctx.pass.texture_units.len();
        let unit = ctx
            .pass
            .texture_units
            .get(ctx.slot)
            .ok_or(ConfigError::TextureUnitOutOfRange { index: ctx.slot, count })?;
        let max = ctx.settings.max_texture_samplers.min(MAX_TEXTURE_STAGES);
        if ctx.slot as u32 >= max {
            return Err(ConfigError::TooManySamplers {
                requested: count as u32,
                max,
            });
        }
        self.set_texture_unit(ctx.slot as u32, unit.clone())?;
        Ok(true)
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        self.resolve_uniforms(programs)?;
        self.resolve_function_parameters(programs)
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let (vs, ps) = programs.split_mut();
        for program in [vs, ps] {
            program.add_dependency(FFP_LIB_COMMON);
            program.add_dependency(FFP_LIB_TEXTURING);
        }
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let (vs, ps) = programs.split_mut();
        self.add_vs_invocations(vs)?;
        self.add_ps_invocations(ps)
    }

    fn update_gpu_programs_params(&mut self, ctx: &mut UpdateContext<'_>) {
        let Some(matrix_id) = self.params.tex_view_proj_image else {
            return;
        };
        let projector = ctx
            .pass
            .texture_units
            .get(self.sampler_index as usize)
            .and_then(|unit| {
                unit.effects().iter().find_map(|effect| match effect {
                    TextureEffect::ProjectiveTexture(projector) => *projector,
                    _ => None,
                })
            });
        if let Some(projector) = projector {
            ctx.vertex_params
                .set_constant(matrix_id, &projector.view_proj_image_matrix());
        }
    }

    fn hash_code(&self) -> u64 {
        let mut folder = base_hash(TEXTURE_STAGE_TYPE);
        folder.fold(&self.sampler_index);
        let Some(unit) = &self.unit else {
            return folder.finish();
        };

        folder.fold(&unit.texture_type);
        // The sampler index folds twice when a texture matrix is used.
        if needs_texture_matrix(unit) {
            folder.fold(&self.sampler_index);
        }
        fold_blend_mode(&mut folder, &unit.colour_blend);
        fold_blend_mode(&mut folder, &unit.alpha_blend);
        for effect in unit.effects() {
            folder.fold(&effect.effect_type());
        }
        folder.fold(&TexCoordCalcMethod::for_unit(unit)).fold(&unit.tex_coord_set());
        folder.finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = downcast_sub_state::<Self>(other) {
            self.sampler_index = other.sampler_index;
            self.unit.clone_from(&other.unit);
            self.params = StageParameters::default();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One texture stage per texture unit of the pass.
pub struct TextureStageFactory;

impl SubRenderStateFactory for TextureStageFactory {
    fn type_name(&self) -> &'static str {
        TEXTURE_STAGE_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(FfpTextureStage::default())
    }

    fn instances_for_pass(&self, pass: &Pass) -> usize {
        pass.texture_units.len()
    }
}
