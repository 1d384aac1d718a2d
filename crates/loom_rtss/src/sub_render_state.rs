//! Sub-Render-State Interface
//!
//! A sub-render-state is one pluggable feature of a generated pass: a texture
//! layer, alpha rejection, terrain blending. The composition layer drives
//! every instance through the same phases, in this order:
//!
//! | Phase | Method | Failure |
//! |-------|--------|---------|
//! | applicability | [`pre_add_to_render_state`] | `Ok(false)` skips the instance, `Err` is a hard [`ConfigError`] |
//! | parameters    | [`resolve_parameters`]      | [`ResolveError`], pass falls back |
//! | libraries     | [`resolve_dependencies`]    | [`ResolveError`], pass falls back |
//! | atoms         | [`add_function_invocations`]| [`ResolveError`], pass falls back |
//! | per draw      | [`update_gpu_programs_params`] | infallible |
//!
//! New features are added by implementing [`SubRenderState`] plus a
//! [`SubRenderStateFactory`] and registering the factory; the composition
//! layer never names concrete types.
//!
//! [`pre_add_to_render_state`]: SubRenderState::pre_add_to_render_state
//! [`resolve_parameters`]: SubRenderState::resolve_parameters
//! [`resolve_dependencies`]: SubRenderState::resolve_dependencies
//! [`add_function_invocations`]: SubRenderState::add_function_invocations
//! [`update_gpu_programs_params`]: SubRenderState::update_gpu_programs_params

use std::any::Any;
use std::fmt;

use loom_core::{ConfigError, HashFolder, ResolveError};
use loom_material::{Light, Pass, Renderable};
use loom_shader::{AutoParamDataSource, GpuProgramParameters, ProgramSet};

use crate::render_state::RenderState;
use crate::settings::GeneratorSettings;

/// What a sub-render-state sees when deciding whether it applies to a pass.
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub pass: &'a Pass,
    /// Instance slot within its factory, e.g. the texture unit index.
    pub slot: usize,
    /// Sub-states accepted so far for this pass.
    pub render_state: &'a RenderState,
    pub settings: &'a GeneratorSettings,
}

/// Values available while pushing per-object parameters before a draw.
pub struct UpdateContext<'a> {
    pub renderable: &'a dyn Renderable,
    pub pass: &'a Pass,
    pub auto_source: &'a AutoParamDataSource,
    pub lights: &'a [Light],
    pub vertex_params: &'a mut GpuProgramParameters,
    pub fragment_params: &'a mut GpuProgramParameters,
}

pub trait SubRenderState: Any + Send + Sync + fmt::Debug {
    /// Stable type name, also the factory key.
    fn type_name(&self) -> &'static str;

    /// Position of this instance within its render state. Ties keep the
    /// order in which instances were added.
    fn execution_order(&self) -> i32;

    /// Decides whether this instance applies to the pass and captures the
    /// pass state it needs.
    fn pre_add_to_render_state(&mut self, _ctx: &PassContext<'_>) -> Result<bool, ConfigError> {
        Ok(true)
    }

    /// Resolves every parameter this instance reads or writes. Calling it
    /// again must yield the same parameters.
    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError>;

    /// Declares the shader libraries the emitted atoms call into.
    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError>;

    /// Emits the atoms implementing this feature.
    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<(), ResolveError>;

    /// Pushes current values into already resolved uniforms. Runs once per
    /// drawn object and must neither allocate parameters nor emit atoms.
    fn update_gpu_programs_params(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Hash of every piece of state that affects the generated source.
    fn hash_code(&self) -> u64;

    /// Copies the configuration of `other`, which has the same type name.
    fn copy_from(&mut self, other: &dyn SubRenderState);

    fn as_any(&self) -> &dyn Any;
}

/// Starts a hash with the type name folded in, the common prefix of every
/// [`SubRenderState::hash_code`].
#[must_use]
pub fn base_hash(type_name: &str) -> HashFolder {
    let mut folder = HashFolder::new();
    folder.fold(type_name);
    folder
}

/// Runs the three generation phases of `sub_state` against `programs`.
pub fn create_cpu_sub_programs(
    sub_state: &mut dyn SubRenderState,
    programs: &mut ProgramSet,
) -> Result<(), ResolveError> {
    sub_state.resolve_parameters(programs)?;
    sub_state.resolve_dependencies(programs)?;
    sub_state.add_function_invocations(programs)
}

/// Creates [`SubRenderState`] instances of one type.
pub trait SubRenderStateFactory: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn create_instance(&self) -> Box<dyn SubRenderState>;

    /// Number of instances offered to `pass` during composition. Factories
    /// returning 0 contribute only through scheme templates.
    fn instances_for_pass(&self, _pass: &Pass) -> usize {
        1
    }
}

/// Downcasts `other` to `T`, for [`SubRenderState::copy_from`]
/// implementations.
#[must_use]
pub fn downcast_sub_state<T: SubRenderState>(other: &dyn SubRenderState) -> Option<&T> {
    other.as_any().downcast_ref::<T>()
}
