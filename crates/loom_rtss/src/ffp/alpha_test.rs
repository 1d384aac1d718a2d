//! Alpha rejection in the fragment program.
//!
//! The comparison function is a uniform rather than part of the generated
//! source, so passes differing only in their reject function share programs.

use std::any::Any;

use loom_core::{ConfigError, ResolveError};
use loom_material::CompareFunction;
use loom_shader::{AutoConstantType, Content, GpuConstantType, ParamId, ProgramSet, Semantic};

use super::{
    ALPHA_TEST_TYPE, FFP_ALPHA_TEST, FFP_FUNC_ALPHA_TEST, FFP_LIB_ALPHA_TEST, FFP_PS_ALPHA_TEST, resolved,
};
use crate::sub_render_state::{PassContext, SubRenderState, SubRenderStateFactory, UpdateContext, base_hash};

#[derive(Debug, Default)]
pub struct AlphaTest {
    function: CompareFunction,
    alpha_func: Option<ParamId>,
    alpha_ref: Option<ParamId>,
    colour_out: Option<ParamId>,
}

impl AlphaTest {
    #[must_use]
    pub fn function(&self) -> CompareFunction {
        self.function
    }
}

impl SubRenderState for AlphaTest {
    fn type_name(&self) -> &'static str {
        ALPHA_TEST_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_ALPHA_TEST
    }

    fn pre_add_to_render_state(&mut self, ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        self.function = ctx.pass.alpha_reject.function;
        Ok(self.function != CompareFunction::AlwaysPass)
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let ps = programs.fragment_mut();
        self.alpha_func = Some(ps.resolve_parameter(GpuConstantType::Float1, Some(0), "gAlphaFunc")?);
        self.alpha_ref = Some(ps.resolve_auto_parameter(AutoConstantType::SurfaceAlphaRejectionValue, 0));
        self.colour_out = Some(ps.resolve_output_parameter(
            Semantic::Color,
            Some(0),
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        programs.fragment_mut().add_dependency(FFP_LIB_ALPHA_TEST);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError> {
        let ps = programs.fragment_mut();
        let operands = [
            ps.op_in(resolved(self.alpha_func, ALPHA_TEST_TYPE)?),
            ps.op_in(resolved(self.alpha_ref, ALPHA_TEST_TYPE)?),
            ps.op_in(resolved(self.colour_out, ALPHA_TEST_TYPE)?),
        ];
        ps.stage(FFP_PS_ALPHA_TEST).call(FFP_FUNC_ALPHA_TEST, operands);
        Ok(())
    }

    fn update_gpu_programs_params(&mut self, ctx: &mut UpdateContext<'_>) {
        if let Some(id) = self.alpha_func {
            ctx.fragment_params
                .set_constant(id, &ctx.pass.alpha_reject.function.shader_code());
        }
    }

    fn hash_code(&self) -> u64 {
        base_hash(ALPHA_TEST_TYPE).finish()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = crate::sub_render_state::downcast_sub_state::<Self>(other) {
            self.function = other.function;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct AlphaTestFactory;

impl SubRenderStateFactory for AlphaTestFactory {
    fn type_name(&self) -> &'static str {
        ALPHA_TEST_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(AlphaTest::default())
    }
}

#[cfg(test)]
mod tests {
    use loom_material::Pass;

    use super::*;
    use crate::render_state::RenderState;
    use crate::settings::GeneratorSettings;
    use crate::sub_render_state::create_cpu_sub_programs;

    fn applies_to(pass: &Pass) -> bool {
        let render_state = RenderState::new();
        let settings = GeneratorSettings::default();
        let ctx = PassContext {
            pass,
            slot: 0,
            render_state: &render_state,
            settings: &settings,
        };
        AlphaTest::default().pre_add_to_render_state(&ctx).unwrap()
    }

    #[test]
    fn test_always_pass_is_skipped() {
        assert!(!applies_to(&Pass::new("opaque")));
        assert!(applies_to(
            &Pass::new("cutout").with_alpha_reject(CompareFunction::GreaterEqual, 128)
        ));
    }

    #[test]
    fn test_emits_alpha_test_atom() {
        let mut alpha_test = AlphaTest::default();
        let mut programs = ProgramSet::new();
        create_cpu_sub_programs(&mut alpha_test, &mut programs).unwrap();

        let ps = programs.fragment();
        let atoms = ps.entry_function().invocations();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].order_key(), (FFP_PS_ALPHA_TEST, 0));
        assert_eq!(
            atoms[0].to_string(),
            "FFP_Alpha_Test(gAlphaFunc0, surface_alpha_rejection_value, oColor_0);"
        );
        assert_eq!(ps.uniform_count(), 2);
        assert_eq!(programs.vertex().parameter_count(), 0);
    }

    #[test]
    fn test_hash_ignores_compare_function() {
        let mut less = AlphaTest::default();
        less.function = CompareFunction::Less;
        let mut greater = AlphaTest::default();
        greater.function = CompareFunction::Greater;
        assert_eq!(less.hash_code(), greater.hash_code());
    }
}
