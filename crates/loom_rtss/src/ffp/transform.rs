//! Vertex position transform into projective space.

use std::any::Any;

use loom_core::ResolveError;
use loom_shader::{AutoConstantType, Content, GpuConstantType, ParamId, ProgramSet, Semantic};

use super::{
    FFP_FUNC_TRANSFORM, FFP_LIB_COMMON, FFP_LIB_TRANSFORM, FFP_TRANSFORM, FFP_VS_TRANSFORM,
    TRANSFORM_TYPE, resolved,
};
use crate::sub_render_state::{PassContext, SubRenderState, SubRenderStateFactory, base_hash};

/// `oPos = worldviewproj * iPos`. Terrain passes use their own transform.
#[derive(Debug, Default)]
pub struct FfpTransform {
    world_view_proj: Option<ParamId>,
    position_in: Option<ParamId>,
    position_out: Option<ParamId>,
}

impl SubRenderState for FfpTransform {
    fn type_name(&self) -> &'static str {
        TRANSFORM_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_TRANSFORM
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, loom_core::ConfigError> {
        Ok(ctx.pass.terrain.is_none())
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        self.world_view_proj = Some(vs.resolve_auto_parameter(AutoConstantType::WorldViewProjMatrix, 0));
        self.position_in = Some(vs.resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float4,
        )?);
        self.position_out = Some(vs.resolve_output_parameter(
            Semantic::Position,
            Some(0),
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_TRANSFORM);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        let operands = [
            vs.op_in(resolved(self.world_view_proj, TRANSFORM_TYPE)?),
            vs.op_in(resolved(self.position_in, TRANSFORM_TYPE)?),
            vs.op_out(resolved(self.position_out, TRANSFORM_TYPE)?),
        ];
        vs.stage(FFP_VS_TRANSFORM).call(FFP_FUNC_TRANSFORM, operands);
        Ok(())
    }

    fn hash_code(&self) -> u64 {
        base_hash(TRANSFORM_TYPE).finish()
    }

    fn copy_from(&mut self, _other: &dyn SubRenderState) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct FfpTransformFactory;

impl SubRenderStateFactory for FfpTransformFactory {
    fn type_name(&self) -> &'static str {
        TRANSFORM_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(FfpTransform::default())
    }
}
