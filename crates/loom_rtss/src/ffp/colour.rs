//! Diffuse and specular colour setup.
//!
//! Provides the fragment colour 0 (diffuse) and colour 1 (specular)
//! parameters that texture stages read, and initialises the output colour.
//! On lit passes both colours are interpolated from the vertex outputs that
//! [`FfpLighting`](super::lighting::FfpLighting) writes. Otherwise, with
//! vertex colour tracking the diffuse colour is the interpolated vertex
//! colour, and without it constant white. Specular is constant black unless
//! lighting produces it, and is added at the end of the colour stage when
//! enabled.

use std::any::Any;

use loom_core::{ConfigError, ResolveError};
use loom_shader::{Content, GpuConstantType, Operand, ParamId, Program, ProgramSet, Semantic};

use super::{
    COLOUR_TYPE, FFP_COLOUR, FFP_FUNC_ADD, FFP_FUNC_CONSTRUCT, FFP_LIB_COMMON, FFP_PS_COLOUR_BEGIN,
    FFP_PS_COLOUR_END, FFP_VS_COLOUR, resolved,
};
use crate::sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, base_hash, downcast_sub_state,
};

#[derive(Debug, Default)]
pub struct FfpColour {
    vertex_colour_tracking: bool,
    specular_enabled: bool,
    lighting: bool,
    lit_specular: bool,
    vs_colour_in: Option<ParamId>,
    vs_colour_out: Option<ParamId>,
    ps_diffuse: Option<ParamId>,
    ps_specular: Option<ParamId>,
    ps_colour_out: Option<ParamId>,
}

impl FfpColour {
    #[must_use]
    pub fn new(vertex_colour_tracking: bool, specular_enabled: bool) -> Self {
        Self {
            vertex_colour_tracking,
            specular_enabled,
            ..Default::default()
        }
    }

    /// Reads diffuse (and specular when `lit_specular`) from the lighting
    /// outputs. Lit specular implies the specular add.
    #[must_use]
    pub fn with_lighting(mut self, lit_specular: bool) -> Self {
        self.lighting = true;
        self.lit_specular = lit_specular;
        self.specular_enabled |= lit_specular;
        self
    }

    fn specular_from_vertex(&self) -> bool {
        self.lighting && self.lit_specular
    }
}

fn constant(program: &Program, id: ParamId, value: f32) -> [Operand; 5] {
    [
        Operand::literal(value),
        Operand::literal(value),
        Operand::literal(value),
        Operand::literal(value),
        program.op_out(id),
    ]
}

impl SubRenderState for FfpColour {
    fn type_name(&self) -> &'static str {
        COLOUR_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_COLOUR
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        self.vertex_colour_tracking = ctx.pass.vertex_colour_tracking;
        self.lighting = ctx.pass.lighting_enabled;
        self.lit_specular = ctx.pass.lit_specular();
        self.specular_enabled = ctx.pass.specular_enabled || self.lit_specular;
        Ok(ctx.pass.terrain.is_none())
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let (vs, ps) = programs.split_mut();

        if self.lighting {
            let colour_out =
                vs.resolve_output_parameter(Semantic::Color, None, Content::ColorDiffuse, GpuConstantType::Float4)?;
            let index = vs.parameter(colour_out).index();
            self.vs_colour_out = Some(colour_out);
            self.ps_diffuse = Some(ps.resolve_input_parameter(
                Semantic::Color,
                index,
                Content::ColorDiffuse,
                GpuConstantType::Float4,
            )?);
        } else if self.vertex_colour_tracking {
            let colour_in =
                vs.resolve_input_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)?;
            let colour_out =
                vs.resolve_output_parameter(Semantic::Color, None, Content::ColorDiffuse, GpuConstantType::Float4)?;
            let index = vs.parameter(colour_out).index();
            self.vs_colour_in = Some(colour_in);
            self.vs_colour_out = Some(colour_out);
            self.ps_diffuse = Some(ps.resolve_input_parameter(
                Semantic::Color,
                index,
                Content::ColorDiffuse,
                GpuConstantType::Float4,
            )?);
        } else {
            self.ps_diffuse =
                Some(ps.resolve_local_parameter(Semantic::Color, 0, "lDiffuse", GpuConstantType::Float4)?);
        }

        self.ps_specular = Some(if self.specular_from_vertex() {
            let specular_out =
                vs.resolve_output_parameter(Semantic::Color, None, Content::ColorSpecular, GpuConstantType::Float4)?;
            let index = vs.parameter(specular_out).index();
            ps.resolve_input_parameter(Semantic::Color, index, Content::ColorSpecular, GpuConstantType::Float4)?
        } else {
            ps.resolve_local_parameter(Semantic::Color, 1, "lSpecular", GpuConstantType::Float4)?
        });
        self.ps_colour_out = Some(ps.resolve_output_parameter(
            Semantic::Color,
            Some(0),
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        programs.vertex_mut().add_dependency(FFP_LIB_COMMON);
        programs.fragment_mut().add_dependency(FFP_LIB_COMMON);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let diffuse = resolved(self.ps_diffuse, COLOUR_TYPE)?;
        let specular = resolved(self.ps_specular, COLOUR_TYPE)?;
        let colour_out = resolved(self.ps_colour_out, COLOUR_TYPE)?;
        let (vs, ps) = programs.split_mut();

        if self.vertex_colour_tracking && !self.lighting {
            let src = vs.op_in(resolved(self.vs_colour_in, COLOUR_TYPE)?);
            let dst = vs.op_out(resolved(self.vs_colour_out, COLOUR_TYPE)?);
            vs.stage(FFP_VS_COLOUR).assign(src, dst);
        }

        let white = constant(ps, diffuse, 1.0);
        let black = constant(ps, specular, 0.0);
        let (src, dst) = (ps.op_in(diffuse), ps.op_out(colour_out));
        let mut stage = ps.stage(FFP_PS_COLOUR_BEGIN);
        if !self.vertex_colour_tracking && !self.lighting {
            stage.call(FFP_FUNC_CONSTRUCT, white);
        }
        if !self.specular_from_vertex() {
            stage.call(FFP_FUNC_CONSTRUCT, black);
        }
        stage.assign(src, dst);

        if self.specular_enabled {
            let operands = [ps.op_in(colour_out), ps.op_in(specular), ps.op_out(colour_out)];
            ps.stage(FFP_PS_COLOUR_END).call(FFP_FUNC_ADD, operands);
        }
        Ok(())
    }

    fn hash_code(&self) -> u64 {
        let mut folder = base_hash(COLOUR_TYPE);
        folder
            .fold(&self.vertex_colour_tracking)
            .fold(&self.specular_enabled)
            .fold(&self.lighting)
            .fold(&self.lit_specular);
        folder.finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = downcast_sub_state::<Self>(other) {
            self.vertex_colour_tracking = other.vertex_colour_tracking;
            self.specular_enabled = other.specular_enabled;
            self.lighting = other.lighting;
            self.lit_specular = other.lit_specular;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct FfpColourFactory;

impl SubRenderStateFactory for FfpColourFactory {
    fn type_name(&self) -> &'static str {
        COLOUR_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(FfpColour::default())
    }
}
