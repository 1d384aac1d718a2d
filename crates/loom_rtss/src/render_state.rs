//! Render States
//!
//! A [`RenderState`] is the ordered list of sub-render-states of one pass.
//! Its hash is the pass half of the program cache key.

use loom_core::{ConfigError, HashFolder, ResolveError};
use loom_shader::ProgramSet;
use thiserror::Error;

use crate::registry::SubRenderStateRegistry;
use crate::sub_render_state::{SubRenderState, create_cpu_sub_programs};

/// A generation phase failed for one sub-render-state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sub-render-state `{sub_state}` failed: {error}")]
pub struct GenerationFailure {
    pub sub_state: &'static str,
    #[source]
    pub error: ResolveError,
}

#[derive(Debug, Default)]
pub struct RenderState {
    sub_states: Vec<Box<dyn SubRenderState>>,
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `sub_state` after every instance with an execution order less
    /// than or equal to its own.
    pub fn add_sub_render_state(&mut self, sub_state: Box<dyn SubRenderState>) {
        let order = sub_state.execution_order();
        let at = self
            .sub_states
            .partition_point(|s| s.execution_order() <= order);
        self.sub_states.insert(at, sub_state);
    }

    /// Removes the first instance of `type_name`.
    pub fn remove_sub_render_state(&mut self, type_name: &str) -> Option<Box<dyn SubRenderState>> {
        let index = self
            .sub_states
            .iter()
            .position(|s| s.type_name() == type_name)?;
        Some(self.sub_states.remove(index))
    }

    #[must_use]
    pub fn find(&self, type_name: &str) -> Option<&dyn SubRenderState> {
        self.sub_states
            .iter()
            .find(|s| s.type_name() == type_name)
            .map(AsRef::as_ref)
    }

    pub fn find_mut(&mut self, type_name: &str) -> Option<&mut Box<dyn SubRenderState>> {
        self.sub_states.iter_mut().find(|s| s.type_name() == type_name)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.find(type_name).is_some()
    }

    pub fn sub_states(&self) -> impl Iterator<Item = &dyn SubRenderState> {
        self.sub_states.iter().map(AsRef::as_ref)
    }

    pub fn sub_states_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SubRenderState>> {
        self.sub_states.iter_mut()
    }

    /// Type names in execution order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sub_states.iter().map(|s| s.type_name())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_states.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_states.is_empty()
    }

    /// Folds the hash of every sub-state in execution order.
    #[must_use]
    pub fn hash_code(&self) -> u64 {
        let mut folder = HashFolder::new();
        for sub_state in &self.sub_states {
            folder.fold_hash(sub_state.hash_code());
        }
        folder.finish()
    }

    /// Runs every generation phase of every sub-state, in execution order,
    /// against a fresh program set. Stops at the first failure.
    pub fn create_program_set(&mut self) -> Result<ProgramSet, GenerationFailure> {
        let mut programs = ProgramSet::new();
        for sub_state in &mut self.sub_states {
            create_cpu_sub_programs(sub_state.as_mut(), &mut programs).map_err(|error| {
                GenerationFailure {
                    sub_state: sub_state.type_name(),
                    error,
                }
            })?;
        }
        Ok(programs)
    }

    /// Creates a copy with fresh instances made through `registry`.
    pub fn duplicate(&self, registry: &SubRenderStateRegistry) -> Result<Self, ConfigError> {
        let mut copy = Self::new();
        for sub_state in &self.sub_states {
            let mut instance = registry.create_instance(sub_state.type_name())?;
            instance.copy_from(sub_state.as_ref());
            copy.sub_states.push(instance);
        }
        Ok(copy)
    }
}
