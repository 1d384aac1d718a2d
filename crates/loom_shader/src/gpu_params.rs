//! Values bound to a program's uniforms.
//!
//! One [`GpuProgramParameters`] exists per program per pass. Its layout is
//! fixed when it is created from a [`Program`]; afterwards values are only
//! overwritten in place, so per-draw updates never allocate.

use bytemuck::cast_slice;
use glam::{Mat4, Vec2, Vec3, Vec4};
use loom_material::{Pass, Renderable, TextureId};
use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;

use crate::auto_params::AutoParamDataSource;
use crate::parameter::{AutoBinding, ParamId};
use crate::program::Program;

/// A value that can be written into a constant slot.
pub trait ConstantValue {
    /// Writes the value into `dst`, truncating to its length.
    fn write_to(&self, dst: &mut [f32]);
}

impl ConstantValue for f32 {
    fn write_to(&self, dst: &mut [f32]) {
        if let Some(first) = dst.first_mut() {
            *first = *self;
        }
    }
}

impl<const N: usize> ConstantValue for [f32; N] {
    fn write_to(&self, dst: &mut [f32]) {
        let len = N.min(dst.len());
        dst[..len].copy_from_slice(&self[..len]);
    }
}

impl ConstantValue for Vec2 {
    fn write_to(&self, dst: &mut [f32]) {
        self.to_array().write_to(dst);
    }
}

impl ConstantValue for Vec3 {
    fn write_to(&self, dst: &mut [f32]) {
        self.to_array().write_to(dst);
    }
}

impl ConstantValue for Vec4 {
    fn write_to(&self, dst: &mut [f32]) {
        self.to_array().write_to(dst);
    }
}

impl ConstantValue for Mat4 {
    fn write_to(&self, dst: &mut [f32]) {
        self.to_cols_array().write_to(dst);
    }
}

#[derive(Debug, Clone, Copy)]
struct ConstantSlot {
    offset: usize,
    len: usize,
}

#[derive(Debug, Clone, Copy)]
struct SamplerSlot {
    unit: u32,
    texture: Option<TextureId>,
}

#[derive(Debug, Clone, Default)]
pub struct GpuProgramParameters {
    float_data: Vec<f32>,
    constants: SecondaryMap<ParamId, ConstantSlot>,
    samplers: SecondaryMap<ParamId, SamplerSlot>,
    by_name: FxHashMap<String, ParamId>,
    auto_constants: Vec<(ParamId, AutoBinding)>,
    texture_bind_count: u64,
}

impl GpuProgramParameters {
    /// Lays out one slot per uniform of `program`. Samplers take consecutive
    /// units in declaration order.
    #[must_use]
    pub fn from_program(program: &Program) -> Self {
        let mut params = Self::default();
        let mut next_unit = 0;
        for (id, parameter) in program.uniforms() {
            params.by_name.insert(parameter.name().to_string(), id);
            if parameter.is_sampler() {
                params.samplers.insert(
                    id,
                    SamplerSlot {
                        unit: next_unit,
                        texture: None,
                    },
                );
                next_unit += 1;
                continue;
            }

            let len = parameter.ty().component_count();
            params.constants.insert(
                id,
                ConstantSlot {
                    offset: params.float_data.len(),
                    len,
                },
            );
            params.float_data.resize(params.float_data.len() + len, 0.0);
            if let Some(binding) = parameter.auto_binding() {
                params.auto_constants.push((id, binding));
            }
        }
        params
    }

    // ─── Constants ──────────────────────────────────────────────────────────

    /// Writes `value` into the slot of `id`. Returns false for unknown ids
    /// and samplers.
    pub fn set_constant(&mut self, id: ParamId, value: &impl ConstantValue) -> bool {
        let Some(slot) = self.constants.get(id).copied() else {
            return false;
        };
        value.write_to(&mut self.float_data[slot.offset..slot.offset + slot.len]);
        true
    }

    pub fn set_named_constant(&mut self, name: &str, value: &impl ConstantValue) -> bool {
        match self.by_name.get(name) {
            Some(&id) => self.set_constant(id, value),
            None => false,
        }
    }

    #[must_use]
    pub fn constant(&self, id: ParamId) -> Option<&[f32]> {
        self.constants
            .get(id)
            .map(|slot| &self.float_data[slot.offset..slot.offset + slot.len])
    }

    #[must_use]
    pub fn named_constant(&self, name: &str) -> Option<&[f32]> {
        self.constant(*self.by_name.get(name)?)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ParamId> {
        self.by_name.get(name).copied()
    }

    /// Refreshes every auto constant for the object about to be drawn.
    pub fn update_auto_params(
        &mut self,
        source: &AutoParamDataSource,
        renderable: &dyn Renderable,
        pass: &Pass,
    ) {
        for &(id, binding) in &self.auto_constants {
            if let Some(slot) = self.constants.get(id) {
                source.write_auto_constant(
                    binding,
                    renderable,
                    pass,
                    &mut self.float_data[slot.offset..slot.offset + slot.len],
                );
            }
        }
    }

    /// The packed constant buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.float_data)
    }

    #[inline]
    #[must_use]
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    // ─── Samplers ───────────────────────────────────────────────────────────

    /// Binds `texture` to the sampler `id`. Returns false for unknown ids.
    pub fn bind_texture(&mut self, id: ParamId, texture: Option<TextureId>) -> bool {
        let Some(slot) = self.samplers.get_mut(id) else {
            return false;
        };
        slot.texture = texture;
        self.texture_bind_count += 1;
        true
    }

    #[must_use]
    pub fn texture(&self, id: ParamId) -> Option<TextureId> {
        self.samplers.get(id)?.texture
    }

    #[must_use]
    pub fn sampler_unit(&self, id: ParamId) -> Option<u32> {
        self.samplers.get(id).map(|slot| slot.unit)
    }

    /// Number of texture binds performed since creation.
    #[inline]
    #[must_use]
    pub fn texture_bind_count(&self) -> u64 {
        self.texture_bind_count
    }

    #[inline]
    #[must_use]
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::AutoConstantType;
    use crate::program::ProgramType;
    use crate::types::GpuConstantType;

    struct Identity;

    impl Renderable for Identity {
        fn world_matrix(&self) -> Mat4 {
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
        }

        fn custom_parameter(&self, index: u32) -> Option<Vec4> {
            (index == 7).then_some(Vec4::new(0.5, 2.0, 0.0, 0.0))
        }
    }

    fn program() -> (Program, ParamId, ParamId, ParamId) {
        let mut program = Program::new(ProgramType::Vertex);
        let wvp = program.resolve_auto_parameter(AutoConstantType::WorldViewProjMatrix, 0);
        let custom = program.resolve_auto_parameter(AutoConstantType::Custom, 7);
        let sampler = program
            .resolve_parameter(GpuConstantType::Sampler2D, Some(3), "gTextureSampler")
            .unwrap();
        (program, wvp, custom, sampler)
    }

    #[test]
    fn test_layout_from_program() {
        let (program, wvp, custom, sampler) = program();
        let params = GpuProgramParameters::from_program(&program);
        assert_eq!(params.constant(wvp).map(<[f32]>::len), Some(16));
        assert_eq!(params.constant(custom).map(<[f32]>::len), Some(4));
        assert_eq!(params.sampler_unit(sampler), Some(0));
        assert_eq!(params.as_bytes().len(), 20 * 4);
    }

    #[test]
    fn test_sampler_units_follow_declaration_order() {
        let mut program = Program::new(ProgramType::Fragment);
        let first = program
            .resolve_parameter(GpuConstantType::Sampler2D, Some(4), "blendTex")
            .unwrap();
        let second = program
            .resolve_parameter(GpuConstantType::Sampler2D, Some(0), "difftex")
            .unwrap();
        let params = GpuProgramParameters::from_program(&program);
        assert_eq!(params.sampler_unit(first), Some(0));
        assert_eq!(params.sampler_unit(second), Some(1));
        assert_eq!(params.sampler_count(), 2);
    }

    #[test]
    fn test_update_auto_params() {
        let (program, wvp, custom, _) = program();
        let mut params = GpuProgramParameters::from_program(&program);
        let source = AutoParamDataSource::new();
        params.update_auto_params(&source, &Identity, &Pass::new("p"));

        let matrix = params.constant(wvp).unwrap();
        assert_eq!(&matrix[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(params.constant(custom).unwrap(), &[0.5, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_named_constant_and_texture_binding() {
        let (program, _, _, sampler) = program();
        let mut params = GpuProgramParameters::from_program(&program);
        assert!(params.set_named_constant("custom7", &Vec4::ONE));
        assert!(!params.set_named_constant("missing", &1.0f32));
        assert!(!params.set_constant(sampler, &1.0f32));

        assert!(params.bind_texture(sampler, Some(TextureId(9))));
        assert_eq!(params.texture(sampler), Some(TextureId(9)));
        assert_eq!(params.texture_bind_count(), 1);
    }
}
