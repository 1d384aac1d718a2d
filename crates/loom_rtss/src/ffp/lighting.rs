//! Per-vertex fixed-function lighting.
//!
//! Writes the vertex diffuse output (colour 0) as the derived scene colour
//! plus the contribution of every light slot, and the specular output
//! (colour 1) when the pass has a specular highlight. Lighting runs in view
//! space. Light slots are typed; at draw time each slot takes the next scene
//! light of its kind, or a blank light when none is left.

use std::any::Any;

use loom_core::{ConfigError, ResolveError};
use loom_material::{Light, LightCount, LightKind};
use loom_shader::{
    AutoConstantType, ConstantValue, Content, GpuConstantType, GpuProgramParameters, Operand, OperandMask,
    ParamId, Program, ProgramSet, Semantic,
};
use smallvec::SmallVec;

use super::{
    FFP_FUNC_ASSIGN, FFP_FUNC_CONSTRUCT, FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE,
    FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE_SPECULAR, FFP_FUNC_LIGHT_POINT_DIFFUSE,
    FFP_FUNC_LIGHT_POINT_DIFFUSE_SPECULAR, FFP_FUNC_LIGHT_SPOT_DIFFUSE, FFP_FUNC_LIGHT_SPOT_DIFFUSE_SPECULAR,
    FFP_FUNC_MODULATE, FFP_LIB_COMMON, FFP_LIB_LIGHTING, FFP_LIGHTING, FFP_VS_LIGHTING, LIGHTING_TYPE,
    MAX_LIGHTS, resolved,
};
use crate::sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, UpdateContext, base_hash, downcast_sub_state,
};

/// Uniforms of one light slot. Which ones are resolved depends on the kind.
#[derive(Debug, Clone, Copy)]
struct LightParams {
    kind: LightKind,
    /// View space, pointing towards the light.
    direction: Option<ParamId>,
    /// View space.
    position: Option<ParamId>,
    attenuation: Option<ParamId>,
    spot: Option<ParamId>,
    diffuse: Option<ParamId>,
    specular: Option<ParamId>,
}

impl LightParams {
    fn new(kind: LightKind) -> Self {
        Self {
            kind,
            direction: None,
            position: None,
            attenuation: None,
            spot: None,
            diffuse: None,
            specular: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FfpLighting {
    light_params: Vec<LightParams>,
    vertex_colour_tracking: bool,
    specular_enabled: bool,
    world_view: Option<ParamId>,
    world_view_it: Option<ParamId>,
    derived_scene_colour: Option<ParamId>,
    shininess: Option<ParamId>,
    vs_position: Option<ParamId>,
    vs_normal: Option<ParamId>,
    vs_colour: Option<ParamId>,
    vs_diffuse_out: Option<ParamId>,
    vs_specular_out: Option<ParamId>,
    tracked_diffuse: Option<ParamId>,
}

impl FfpLighting {
    #[must_use]
    pub fn new(count: LightCount, vertex_colour_tracking: bool, specular_enabled: bool) -> Self {
        let mut lighting = Self {
            vertex_colour_tracking,
            specular_enabled,
            ..Default::default()
        };
        lighting.set_light_count(count);
        lighting
    }

    /// Replaces the light slots. Resolved parameters are dropped.
    pub fn set_light_count(&mut self, count: LightCount) {
        self.light_params = count.kinds().map(LightParams::new).collect();
    }

    #[must_use]
    pub fn light_count(&self) -> LightCount {
        let mut count = LightCount::new(0, 0, 0);
        for params in &self.light_params {
            match params.kind {
                LightKind::Point => count.point += 1,
                LightKind::Directional => count.directional += 1,
                LightKind::Spot => count.spot += 1,
            }
        }
        count
    }

    /// Kind of every light slot, in slot order.
    pub fn light_kinds(&self) -> impl Iterator<Item = LightKind> + '_ {
        self.light_params.iter().map(|params| params.kind)
    }

    fn needs_position(&self) -> bool {
        self.specular_enabled
            || self
                .light_params
                .iter()
                .any(|params| params.kind != LightKind::Directional)
    }

    fn resolve_light_params(&mut self, vs: &mut Program) -> Result<(), ResolveError> {
        let specular_enabled = self.specular_enabled;
        for (slot, params) in self.light_params.iter_mut().enumerate() {
            let index = Some(slot as u32);
            let mut uniform = |ty: GpuConstantType, name: &'static str| vs.resolve_parameter(ty, index, name);
            match params.kind {
                LightKind::Directional => {
                    params.direction = Some(uniform(GpuConstantType::Float4, "gLightDirectionView")?);
                }
                LightKind::Point => {
                    params.position = Some(uniform(GpuConstantType::Float4, "gLightPositionView")?);
                    params.attenuation = Some(uniform(GpuConstantType::Float4, "gLightAttenuation")?);
                }
                LightKind::Spot => {
                    params.position = Some(uniform(GpuConstantType::Float4, "gLightPositionView")?);
                    params.direction = Some(uniform(GpuConstantType::Float4, "gLightDirectionView")?);
                    params.attenuation = Some(uniform(GpuConstantType::Float4, "gLightAttenuation")?);
                    params.spot = Some(uniform(GpuConstantType::Float3, "gSpotParams")?);
                }
            }
            params.diffuse = Some(uniform(GpuConstantType::Float4, "gLightDiffuse")?);
            if specular_enabled {
                params.specular = Some(uniform(GpuConstantType::Float4, "gLightSpecular")?);
            }
        }
        Ok(())
    }

    fn light_invocation(
        &self,
        vs: &Program,
        params: &LightParams,
        diffuse: Operand,
    ) -> Result<(&'static str, SmallVec<[Operand; 16]>), ResolveError> {
        let uniform = |id| resolved(id, LIGHTING_TYPE);
        let mut operands: SmallVec<[Operand; 16]> = SmallVec::new();

        // Only the diffuse-only directional light ignores the vertex position.
        if self.specular_enabled || params.kind != LightKind::Directional {
            operands.push(vs.op_in(uniform(self.world_view)?));
            operands.push(vs.op_in(uniform(self.vs_position)?));
        }
        operands.push(vs.op_in(uniform(self.world_view_it)?));
        operands.push(vs.op_in(uniform(self.vs_normal)?));

        let function = match (params.kind, self.specular_enabled) {
            (LightKind::Directional, specular) => {
                operands.push(rgb(vs, uniform(params.direction)?));
                if specular {
                    FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE_SPECULAR
                } else {
                    FFP_FUNC_LIGHT_DIRECTIONAL_DIFFUSE
                }
            }
            (LightKind::Point, specular) => {
                operands.push(rgb(vs, uniform(params.position)?));
                operands.push(vs.op_in(uniform(params.attenuation)?));
                if specular {
                    FFP_FUNC_LIGHT_POINT_DIFFUSE_SPECULAR
                } else {
                    FFP_FUNC_LIGHT_POINT_DIFFUSE
                }
            }
            (LightKind::Spot, specular) => {
                operands.push(rgb(vs, uniform(params.position)?));
                operands.push(rgb(vs, uniform(params.direction)?));
                operands.push(vs.op_in(uniform(params.attenuation)?));
                operands.push(vs.op_in(uniform(params.spot)?));
                if specular {
                    FFP_FUNC_LIGHT_SPOT_DIFFUSE_SPECULAR
                } else {
                    FFP_FUNC_LIGHT_SPOT_DIFFUSE
                }
            }
        };

        operands.push(diffuse);
        if self.specular_enabled {
            operands.push(rgb(vs, uniform(params.specular)?));
            operands.push(vs.op_in(uniform(self.shininess)?));
        }
        operands.push(
            vs.op_in_out(uniform(self.vs_diffuse_out)?)
                .with_mask(OperandMask::XYZ),
        );
        if self.specular_enabled {
            operands.push(
                vs.op_in_out(uniform(self.vs_specular_out)?)
                    .with_mask(OperandMask::XYZ),
            );
        }
        Ok((function, operands))
    }
}

fn rgb(program: &Program, id: ParamId) -> Operand {
    program.op_in(id).with_mask(OperandMask::XYZ)
}

fn set(params: &mut GpuProgramParameters, id: Option<ParamId>, value: &impl ConstantValue) {
    if let Some(id) = id {
        params.set_constant(id, value);
    }
}

/// Assigns a scene light to every slot: the next unused light of the slot's
/// kind, or a blank light of that kind.
fn match_lights<'a>(
    kinds: impl Iterator<Item = LightKind> + 'a,
    lights: &'a [Light],
) -> impl Iterator<Item = Light> + 'a {
    let mut current = LightKind::Directional;
    let mut search = 0;
    kinds.map(move |kind| {
        if kind != current {
            current = kind;
            search = 0;
        }
        match lights[search..].iter().position(|light| light.kind == kind) {
            Some(offset) => {
                search += offset + 1;
                lights[search - 1]
            }
            None => {
                search = lights.len();
                Light::blank(kind)
            }
        }
    })
}

impl SubRenderState for FfpLighting {
    fn type_name(&self) -> &'static str {
        LIGHTING_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_LIGHTING
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        let pass = ctx.pass;
        if !pass.lighting_enabled || pass.terrain.is_some() {
            return Ok(false);
        }
        let count = pass.light_count.unwrap_or(ctx.settings.light_count);
        if count.total() > MAX_LIGHTS {
            return Err(ConfigError::TooManyLights {
                requested: count.total(),
                max: MAX_LIGHTS,
            });
        }
        self.vertex_colour_tracking = pass.vertex_colour_tracking;
        self.specular_enabled = pass.lit_specular();
        self.set_light_count(count);
        Ok(true)
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();

        self.world_view_it = Some(vs.resolve_auto_parameter(AutoConstantType::InverseTransposeWorldViewMatrix, 0));
        self.derived_scene_colour = Some(vs.resolve_auto_parameter(AutoConstantType::DerivedSceneColour, 0));
        self.vs_normal = Some(vs.resolve_input_parameter(
            Semantic::Normal,
            0,
            Content::NormalObjectSpace,
            GpuConstantType::Float3,
        )?);
        self.vs_diffuse_out = Some(vs.resolve_output_parameter(
            Semantic::Color,
            None,
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);

        if self.vertex_colour_tracking {
            self.vs_colour = Some(vs.resolve_input_parameter(
                Semantic::Color,
                0,
                Content::ColorDiffuse,
                GpuConstantType::Float4,
            )?);
            self.tracked_diffuse =
                Some(vs.resolve_local_parameter(Semantic::Unknown, 0, "lTrackedDiffuse", GpuConstantType::Float4)?);
        }

        if self.needs_position() {
            self.world_view = Some(vs.resolve_auto_parameter(AutoConstantType::WorldViewMatrix, 0));
            self.vs_position = Some(vs.resolve_input_parameter(
                Semantic::Position,
                0,
                Content::PositionObjectSpace,
                GpuConstantType::Float4,
            )?);
        }

        if self.specular_enabled {
            self.shininess = Some(vs.resolve_auto_parameter(AutoConstantType::SurfaceShininess, 0));
            self.vs_specular_out = Some(vs.resolve_output_parameter(
                Semantic::Color,
                None,
                Content::ColorSpecular,
                GpuConstantType::Float4,
            )?);
        }

        self.resolve_light_params(vs)
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_LIGHTING);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let vs = programs.vertex_mut();
        let diffuse_out = resolved(self.vs_diffuse_out, LIGHTING_TYPE)?;

        let scene = [
            vs.op_in(resolved(self.derived_scene_colour, LIGHTING_TYPE)?),
            vs.op_out(diffuse_out),
        ];
        vs.stage(FFP_VS_LIGHTING).call(FFP_FUNC_ASSIGN, scene);

        if self.specular_enabled {
            let specular_out = vs.op_out(resolved(self.vs_specular_out, LIGHTING_TYPE)?);
            let black = [
                Operand::literal(0.0),
                Operand::literal(0.0),
                Operand::literal(0.0),
                Operand::literal(0.0),
                specular_out,
            ];
            vs.stage(FFP_VS_LIGHTING).call(FFP_FUNC_CONSTRUCT, black);
        }

        for params in &self.light_params {
            let light_diffuse = resolved(params.diffuse, LIGHTING_TYPE)?;
            let diffuse = if self.vertex_colour_tracking {
                let tracked = resolved(self.tracked_diffuse, LIGHTING_TYPE)?;
                let modulate = [
                    rgb(vs, resolved(self.vs_colour, LIGHTING_TYPE)?),
                    rgb(vs, light_diffuse),
                    vs.op_out(tracked).with_mask(OperandMask::XYZ),
                ];
                vs.stage(FFP_VS_LIGHTING).call(FFP_FUNC_MODULATE, modulate);
                rgb(vs, tracked)
            } else {
                rgb(vs, light_diffuse)
            };

            let (function, operands) = self.light_invocation(vs, params, diffuse)?;
            vs.stage(FFP_VS_LIGHTING).call(function, operands);
        }
        Ok(())
    }

    fn update_gpu_programs_params(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.light_params.is_empty() {
            return;
        }
        let view = ctx.auto_source.view_matrix();
        let view_it = view.inverse().transpose();
        let surface = ctx.pass.surface;
        let params = &mut *ctx.vertex_params;

        let slots = self.light_params.iter();
        let lights = match_lights(self.light_params.iter().map(|p| p.kind), ctx.lights);
        for (slot, light) in slots.zip(lights) {
            match slot.kind {
                LightKind::Directional => {
                    let towards = view.transform_vector3(-light.direction).normalize_or_zero();
                    set(params, slot.direction, &towards.extend(0.0));
                }
                LightKind::Point => {
                    set(params, slot.position, &view.transform_point3(light.position).extend(1.0));
                    set(params, slot.attenuation, &light.attenuation);
                }
                LightKind::Spot => {
                    let towards = -view_it.transform_vector3(light.direction).normalize_or_zero();
                    set(params, slot.position, &view.transform_point3(light.position).extend(1.0));
                    set(params, slot.direction, &towards.extend(0.0));
                    set(params, slot.attenuation, &light.attenuation);
                    set(params, slot.spot, &light.spot_params());
                }
            }

            let diffuse = if self.vertex_colour_tracking {
                light.diffuse
            } else {
                light.diffuse * surface.diffuse
            };
            set(params, slot.diffuse, &diffuse);
            if self.specular_enabled {
                set(params, slot.specular, &(light.specular * surface.specular));
            }
        }
    }

    fn hash_code(&self) -> u64 {
        let mut folder = base_hash(LIGHTING_TYPE);
        folder
            .fold(&self.vertex_colour_tracking)
            .fold(&self.specular_enabled)
            .fold(&self.light_params.len());
        for kind in self.light_kinds() {
            folder.fold(&kind);
        }
        folder.finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = downcast_sub_state::<Self>(other) {
            self.vertex_colour_tracking = other.vertex_colour_tracking;
            self.specular_enabled = other.specular_enabled;
            self.set_light_count(other.light_count());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct FfpLightingFactory;

impl SubRenderStateFactory for FfpLightingFactory {
    fn type_name(&self) -> &'static str {
        LIGHTING_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(FfpLighting::default())
    }
}
