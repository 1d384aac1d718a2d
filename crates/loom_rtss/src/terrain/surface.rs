//! Terrain surface: layer blending and lighting.
//!
//! Layer 0 is the base. Every further layer `n` is blended on top with the
//! weight stored in channel `(n - 1) % 4` of blend map `(n - 1) / 4`. Each
//! layer tiles by its own UV multiplier, packed four per `uvMul_<i>`
//! uniform. The blended colour is lit by the first directional light using
//! the global normal map.
//!
//! Uniform values and texture bindings are pushed per drawn object. Textures
//! are rebound only when the layer set's texture hash changes.

use std::any::Any;

use glam::{Vec3, Vec4};
use loom_core::{ConfigError, ResolveError};
use loom_material::{LightKind, Pass};
use loom_shader::{Content, GpuConstantType, Operand, OperandMask, ParamId, ProgramSet, Semantic};
use smallvec::SmallVec;

use super::{
    TERRAIN_FUNC_BLEND_LAYER, TERRAIN_FUNC_FETCH_NORMAL, TERRAIN_FUNC_LAMBERT, TERRAIN_LIB_SURFACE,
    TERRAIN_PS_SURFACE, TERRAIN_SURFACE, TERRAIN_SURFACE_TYPE,
};
use crate::ffp::{FFP_FUNC_CONSTRUCT, FFP_FUNC_SAMPLE_TEXTURE, FFP_LIB_COMMON, FFP_LIB_TEXTURING, resolved};
use crate::sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, UpdateContext, base_hash, downcast_sub_state,
};

type ParamList = SmallVec<[ParamId; 4]>;

const CHANNELS: [OperandMask; 4] = [OperandMask::X, OperandMask::Y, OperandMask::Z, OperandMask::W];

#[derive(Debug, Default)]
pub struct TerrainSurface {
    layer_count: u32,
    blend_texture_count: u32,
    uv_multiplier_count: u32,
    global_normal: Option<ParamId>,
    blend_samplers: ParamList,
    diffuse_samplers: ParamList,
    uv_multipliers: ParamList,
    blend_values: ParamList,
    light_direction: Option<ParamId>,
    light_diffuse: Option<ParamId>,
    uv_in: Option<ParamId>,
    normal: Option<ParamId>,
    diffuse_spec: Option<ParamId>,
    colour_out: Option<ParamId>,
    last_texture_hash: Option<u64>,
}

impl TerrainSurface {
    #[must_use]
    pub fn new(layer_count: u32) -> Self {
        let mut surface = Self::default();
        surface.set_layer_count(layer_count);
        surface
    }

    fn set_layer_count(&mut self, layer_count: u32) {
        self.layer_count = layer_count;
        self.blend_texture_count = if layer_count <= 1 { 0 } else { (layer_count - 2) / 4 + 1 };
        self.uv_multiplier_count = layer_count.div_ceil(4);
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Samplers the fragment program declares: normal map, blend maps and
    /// one diffuse map per layer.
    #[must_use]
    pub fn sampler_count(&self) -> u32 {
        1 + self.blend_texture_count + self.layer_count
    }
}

impl SubRenderState for TerrainSurface {
    fn type_name(&self) -> &'static str {
        TERRAIN_SURFACE_TYPE
    }

    fn execution_order(&self) -> i32 {
        TERRAIN_SURFACE
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        let Some(terrain) = &ctx.pass.terrain else {
            return Ok(false);
        };
        self.set_layer_count(terrain.layer_count());
        let max = ctx.settings.max_texture_samplers;
        if self.sampler_count() > max {
            return Err(ConfigError::TooManySamplers {
                requested: self.sampler_count(),
                max,
            });
        }
        self.last_texture_hash = None;
        Ok(self.layer_count > 0)
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let (vs, ps) = programs.split_mut();

        self.global_normal = Some(ps.resolve_parameter(GpuConstantType::Sampler2D, Some(0), "globalNormal")?);
        self.blend_samplers = (0..self.blend_texture_count)
            .map(|i| ps.resolve_parameter(GpuConstantType::Sampler2D, Some(i), "blendTex"))
            .collect::<Result<_, _>>()?;
        self.diffuse_samplers = (0..self.layer_count)
            .map(|i| ps.resolve_parameter(GpuConstantType::Sampler2D, Some(i), "difftex"))
            .collect::<Result<_, _>>()?;
        self.uv_multipliers = (0..self.uv_multiplier_count)
            .map(|i| ps.resolve_parameter(GpuConstantType::Float4, Some(i), "uvMul_"))
            .collect::<Result<_, _>>()?;
        self.light_direction = Some(ps.resolve_parameter(GpuConstantType::Float3, Some(0), "lightDirection")?);
        self.light_diffuse = Some(ps.resolve_parameter(GpuConstantType::Float4, Some(0), "lightDiffuse")?);

        // Shared with the terrain transform, which writes it.
        let uv_out = vs.resolve_output_parameter(
            Semantic::TextureCoordinates,
            None,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )?;
        self.uv_in = Some(ps.resolve_input_parameter(
            Semantic::TextureCoordinates,
            vs.parameter(uv_out).index(),
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )?);

        self.blend_values = (0..self.blend_texture_count)
            .map(|i| {
                ps.resolve_local_parameter(
                    Semantic::Unknown,
                    i,
                    &format!("blendTexVal{i}"),
                    GpuConstantType::Float4,
                )
            })
            .collect::<Result<_, _>>()?;
        self.normal = Some(ps.resolve_local_parameter(Semantic::Normal, 0, "normal", GpuConstantType::Float3)?);
        self.diffuse_spec =
            Some(ps.resolve_local_parameter(Semantic::Unknown, 0, "diffuseSpec", GpuConstantType::Float4)?);
        self.colour_out = Some(ps.resolve_output_parameter(
            Semantic::Color,
            Some(0),
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let ps = programs.fragment_mut();
        ps.add_dependency(FFP_LIB_COMMON);
        ps.add_dependency(FFP_LIB_TEXTURING);
        ps.add_dependency(TERRAIN_LIB_SURFACE);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let ps = programs.fragment_mut();
        let uv = resolved(self.uv_in, TERRAIN_SURFACE_TYPE)?;
        let normal = resolved(self.normal, TERRAIN_SURFACE_TYPE)?;
        let diffuse_spec = resolved(self.diffuse_spec, TERRAIN_SURFACE_TYPE)?;
        if self.diffuse_samplers.len() != self.layer_count as usize {
            return Err(ResolveError::NotResolved(TERRAIN_SURFACE_TYPE));
        }

        let operands = [
            ps.op_in(resolved(self.global_normal, TERRAIN_SURFACE_TYPE)?),
            ps.op_in(uv),
            ps.op_out(normal),
        ];
        ps.stage(TERRAIN_PS_SURFACE).call(TERRAIN_FUNC_FETCH_NORMAL, operands);

        for (&sampler, &value) in self.blend_samplers.iter().zip(&self.blend_values) {
            let operands = [ps.op_in(sampler), ps.op_in(uv), ps.op_out(value)];
            ps.stage(TERRAIN_PS_SURFACE).call(FFP_FUNC_SAMPLE_TEXTURE, operands);
        }

        let operands = [
            Operand::literal(0.0),
            Operand::literal(0.0),
            Operand::literal(0.0),
            Operand::literal(1.0),
            ps.op_out(diffuse_spec),
        ];
        ps.stage(TERRAIN_PS_SURFACE).call(FFP_FUNC_CONSTRUCT, operands);

        for (layer, &sampler) in self.diffuse_samplers.iter().enumerate() {
            let weight = if layer == 0 {
                Operand::literal(1.0)
            } else {
                let value = self.blend_values[(layer - 1) / 4];
                ps.op_in(value).with_mask(CHANNELS[(layer - 1) % 4])
            };
            let uv_mul = ps
                .op_in(self.uv_multipliers[layer / 4])
                .with_mask(CHANNELS[layer % 4]);
            let operands = [weight, ps.op_in(uv), uv_mul, ps.op_in(sampler), ps.op_in_out(diffuse_spec)];
            ps.stage(TERRAIN_PS_SURFACE).call(TERRAIN_FUNC_BLEND_LAYER, operands);
        }

        let operands = [
            ps.op_in(normal),
            ps.op_in(resolved(self.light_direction, TERRAIN_SURFACE_TYPE)?),
            ps.op_in(resolved(self.light_diffuse, TERRAIN_SURFACE_TYPE)?),
            ps.op_in(diffuse_spec),
            ps.op_out(resolved(self.colour_out, TERRAIN_SURFACE_TYPE)?),
        ];
        ps.stage(TERRAIN_PS_SURFACE).call(TERRAIN_FUNC_LAMBERT, operands);
        Ok(())
    }

    fn update_gpu_programs_params(&mut self, ctx: &mut UpdateContext<'_>) {
        let Some(terrain) = &ctx.pass.terrain else {
            return;
        };
        let params = &mut *ctx.fragment_params;

        for (group, &id) in self.uv_multipliers.iter().enumerate() {
            params.set_constant(id, &terrain.packed_uv_multipliers(group));
        }

        let light = ctx.lights.iter().find(|light| light.kind == LightKind::Directional);
        let (direction, diffuse) = light.map_or((Vec3::NEG_Y, Vec4::ZERO), |light| (light.direction, light.diffuse));
        if let Some(id) = self.light_direction {
            params.set_constant(id, &direction);
        }
        if let Some(id) = self.light_diffuse {
            params.set_constant(id, &diffuse);
        }

        let texture_hash = terrain.texture_hash();
        if self.last_texture_hash == Some(texture_hash) {
            return;
        }
        if let Some(id) = self.global_normal {
            params.bind_texture(id, terrain.global_normal_map);
        }
        for (i, &id) in self.blend_samplers.iter().enumerate() {
            params.bind_texture(id, terrain.blend_maps.get(i).copied());
        }
        for (layer, &id) in self.diffuse_samplers.iter().enumerate() {
            params.bind_texture(id, terrain.layers.get(layer).map(|layer| layer.diffuse));
        }
        self.last_texture_hash = Some(texture_hash);
    }

    fn hash_code(&self) -> u64 {
        let mut folder = base_hash(TERRAIN_SURFACE_TYPE);
        folder.fold(&self.layer_count);
        folder.finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = downcast_sub_state::<Self>(other) {
            self.set_layer_count(other.layer_count);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Offered only to terrain passes.
pub struct TerrainSurfaceFactory;

impl SubRenderStateFactory for TerrainSurfaceFactory {
    fn type_name(&self) -> &'static str {
        TERRAIN_SURFACE_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(TerrainSurface::default())
    }

    fn instances_for_pass(&self, pass: &Pass) -> usize {
        usize::from(pass.terrain.is_some())
    }
}

#[cfg(test)]
mod tests {
    use loom_material::{TerrainAlignment, TerrainLayer, TerrainLayerSet, TextureId};

    use super::*;
    use crate::render_state::RenderState;
    use crate::settings::GeneratorSettings;
    use crate::sub_render_state::create_cpu_sub_programs;
    use crate::terrain::transform::TerrainTransform;

    fn layer_set(count: u64) -> TerrainLayerSet {
        TerrainLayerSet {
            layers: (0..count)
                .map(|i| TerrainLayer {
                    diffuse: TextureId(10 + i),
                    world_size: 8.0,
                })
                .collect(),
            blend_maps: vec![TextureId(2), TextureId(3)],
            global_normal_map: Some(TextureId(1)),
            terrain_world_size: 64.0,
            alignment: TerrainAlignment::AlignXZ,
            lod_morph: false,
        }
    }

    fn programs_for(layers: u32) -> ProgramSet {
        let mut programs = ProgramSet::new();
        create_cpu_sub_programs(
            &mut TerrainTransform::new(TerrainAlignment::AlignXZ, false),
            &mut programs,
        )
        .unwrap();
        create_cpu_sub_programs(&mut TerrainSurface::new(layers), &mut programs).unwrap();
        programs
    }

    #[test]
    fn test_layer_blending_atoms() {
        let programs = programs_for(6);
        let atoms: Vec<_> = programs
            .fragment()
            .entry_function()
            .invocations_in_group(TERRAIN_PS_SURFACE)
            .map(ToString::to_string)
            .collect();

        assert_eq!(atoms[0], "SGX_FetchNormal(globalNormal0, iTexcoord_0, normal);");
        assert_eq!(atoms[1], "FFP_SampleTexture(blendTex0, iTexcoord_0, blendTexVal0);");
        assert_eq!(atoms[2], "FFP_SampleTexture(blendTex1, iTexcoord_0, blendTexVal1);");
        assert_eq!(atoms[3], "FFP_Construct(0.0, 0.0, 0.0, 1.0, diffuseSpec);");
        assert_eq!(
            atoms[4],
            "blendTerrainLayer(1.0, iTexcoord_0, uvMul_0.x, difftex0, diffuseSpec);"
        );
        assert_eq!(
            atoms[5],
            "blendTerrainLayer(blendTexVal0.x, iTexcoord_0, uvMul_0.y, difftex1, diffuseSpec);"
        );
        assert_eq!(
            atoms[9],
            "blendTerrainLayer(blendTexVal1.x, iTexcoord_0, uvMul_1.y, difftex5, diffuseSpec);"
        );
        assert_eq!(
            atoms[10],
            "SGX_TerrainLambert(normal, lightDirection0, lightDiffuse0, diffuseSpec, oColor_0);"
        );
        assert_eq!(atoms.len(), 11);
    }

    #[test]
    fn test_sampler_limit() {
        let pass = Pass::new("terrain").with_terrain(layer_set(12));
        let render_state = RenderState::new();
        let settings = GeneratorSettings {
            max_texture_samplers: 8,
            ..Default::default()
        };
        let ctx = PassContext {
            pass: &pass,
            slot: 0,
            render_state: &render_state,
            settings: &settings,
        };
        assert_eq!(
            TerrainSurface::default().pre_add_to_render_state(&ctx),
            Err(ConfigError::TooManySamplers { requested: 16, max: 8 })
        );
    }

    #[test]
    fn test_uv_interpolant_shared_with_transform() {
        let programs = programs_for(2);
        let vs_outputs = programs.vertex().entry_function().outputs();
        assert_eq!(vs_outputs.len(), 2);
        assert!(programs.vertex().find_output(Semantic::TextureCoordinates, 0).is_some());
        assert!(programs.fragment().find_input(Semantic::TextureCoordinates, 0).is_some());
    }

    #[test]
    fn test_hash_follows_layer_count() {
        assert_eq!(TerrainSurface::new(3).hash_code(), TerrainSurface::new(3).hash_code());
        assert_ne!(TerrainSurface::new(3).hash_code(), TerrainSurface::new(4).hash_code());
    }
}
