//! Terrain vertex transform with optional LOD morphing.
//!
//! ```text
//! worldPos = world * iPos
//! worldPos.<height> += morph(delta, lodMorph)     lod_morph only
//! oPos     = viewproj * worldPos
//! oUv      = iUv
//! ```

use std::any::Any;

use loom_core::{ConfigError, ResolveError};
use loom_material::{Pass, TerrainAlignment};
use loom_shader::{AutoConstantType, Content, GpuConstantType, OperandMask, ParamId, ProgramSet, Semantic};

use super::{
    LOD_MORPH_PARAM_INDEX, TERRAIN_FUNC_LOD_MORPH, TERRAIN_LIB_TRANSFORMS, TERRAIN_TRANSFORM,
    TERRAIN_TRANSFORM_TYPE, TERRAIN_VS_TRANSFORM,
};
use crate::ffp::{FFP_FUNC_TRANSFORM, FFP_LIB_COMMON, FFP_LIB_TRANSFORM, resolved};
use crate::sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, base_hash, downcast_sub_state,
};

const fn height_mask(alignment: TerrainAlignment) -> OperandMask {
    match alignment {
        TerrainAlignment::AlignXZ => OperandMask::Y,
        TerrainAlignment::AlignXY => OperandMask::Z,
        TerrainAlignment::AlignYZ => OperandMask::X,
    }
}

#[derive(Debug, Default)]
pub struct TerrainTransform {
    alignment: TerrainAlignment,
    lod_morph: bool,
    world: Option<ParamId>,
    view_proj: Option<ParamId>,
    lod_morph_param: Option<ParamId>,
    position_in: Option<ParamId>,
    uv_in: Option<ParamId>,
    delta_in: Option<ParamId>,
    world_position: Option<ParamId>,
    position_out: Option<ParamId>,
    uv_out: Option<ParamId>,
}

impl TerrainTransform {
    #[must_use]
    pub fn new(alignment: TerrainAlignment, lod_morph: bool) -> Self {
        Self {
            alignment,
            lod_morph,
            ..Default::default()
        }
    }
}

impl SubRenderState for TerrainTransform {
    fn type_name(&self) -> &'static str {
        TERRAIN_TRANSFORM_TYPE
    }

    fn execution_order(&self) -> i32 {
        TERRAIN_TRANSFORM
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        let Some(terrain) = &ctx.pass.terrain else {
            return Ok(false);
        };
        self.alignment = terrain.alignment;
        self.lod_morph = terrain.lod_morph;
        Ok(true)
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        self.world = Some(vs.resolve_auto_parameter(AutoConstantType::WorldMatrix, 0));
        self.view_proj = Some(vs.resolve_auto_parameter(AutoConstantType::ViewProjMatrix, 0));

        self.position_in = Some(vs.resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float4,
        )?);
        self.uv_in = Some(vs.resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )?);
        if self.lod_morph {
            self.lod_morph_param = Some(vs.resolve_auto_parameter(AutoConstantType::Custom, LOD_MORPH_PARAM_INDEX));
            self.delta_in = Some(vs.resolve_input_parameter(
                Semantic::TextureCoordinates,
                1,
                Content::TextureCoordinate(1),
                GpuConstantType::Float2,
            )?);
        }

        self.world_position =
            Some(vs.resolve_local_parameter(Semantic::Position, 1, "worldPos", GpuConstantType::Float4)?);
        self.position_out = Some(vs.resolve_output_parameter(
            Semantic::Position,
            Some(0),
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )?);

        let uv_out = vs.resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )?;
        let uv_index = vs.parameter(uv_out).index();
        self.uv_out = Some(uv_out);
        programs.fragment_mut().resolve_input_parameter(
            Semantic::TextureCoordinates,
            uv_index,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )?;
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_TRANSFORM);
        vs.add_dependency(TERRAIN_LIB_TRANSFORMS);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        let world_position = resolved(self.world_position, TERRAIN_TRANSFORM_TYPE)?;

        let operands = [
            vs.op_in(resolved(self.world, TERRAIN_TRANSFORM_TYPE)?),
            vs.op_in(resolved(self.position_in, TERRAIN_TRANSFORM_TYPE)?),
            vs.op_out(world_position),
        ];
        vs.stage(TERRAIN_VS_TRANSFORM).call(FFP_FUNC_TRANSFORM, operands);

        if self.lod_morph {
            let operands = [
                vs.op_in(resolved(self.delta_in, TERRAIN_TRANSFORM_TYPE)?),
                vs.op_in(resolved(self.lod_morph_param, TERRAIN_TRANSFORM_TYPE)?)
                    .with_mask(OperandMask::XY),
                vs.op_in_out(world_position).with_mask(height_mask(self.alignment)),
            ];
            vs.stage(TERRAIN_VS_TRANSFORM).call(TERRAIN_FUNC_LOD_MORPH, operands);
        }

        let operands = [
            vs.op_in(resolved(self.view_proj, TERRAIN_TRANSFORM_TYPE)?),
            vs.op_in(world_position),
            vs.op_out(resolved(self.position_out, TERRAIN_TRANSFORM_TYPE)?),
        ];
        let uv = (
            vs.op_in(resolved(self.uv_in, TERRAIN_TRANSFORM_TYPE)?),
            vs.op_out(resolved(self.uv_out, TERRAIN_TRANSFORM_TYPE)?),
        );
        vs.stage(TERRAIN_VS_TRANSFORM)
            .call(FFP_FUNC_TRANSFORM, operands)
            .assign(uv.0, uv.1);
        Ok(())
    }

    fn hash_code(&self) -> u64 {
        let mut folder = base_hash(TERRAIN_TRANSFORM_TYPE);
        folder.fold(&self.alignment).fold(&self.lod_morph);
        folder.finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = downcast_sub_state::<Self>(other) {
            self.alignment = other.alignment;
            self.lod_morph = other.lod_morph;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Offered only to terrain passes.
pub struct TerrainTransformFactory;

impl SubRenderStateFactory for TerrainTransformFactory {
    fn type_name(&self) -> &'static str {
        TERRAIN_TRANSFORM_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(TerrainTransform::default())
    }

    fn instances_for_pass(&self, pass: &Pass) -> usize {
        usize::from(pass.terrain.is_some())
    }
}
