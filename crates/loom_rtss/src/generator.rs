//! Shader Generator
//!
//! Turns material passes into generated program pairs.
//!
//! ## Pass build
//!
//! | Step | Work | Failure |
//! |------|------|---------|
//! | compose   | offer every factory's instances to the pass, overlay the scheme template | `ConfigError`, returned |
//! | generate  | run the render state's generation phases into a fresh [`ProgramSet`] | fallback |
//! | key       | fold the renderable hash with the render-state hash | - |
//! | L1 lookup | reuse compiled programs for the same key | - |
//! | write     | serialize the program set to source | fallback |
//! | compile   | L2 source dedupe, then compile | fallback |
//! | stash     | keep render state and parameters on the pass for draw time | - |
//!
//! A fallback leaves the pass without generated state; the caller renders it
//! with whatever it used before. It is reported as
//! [`PassBuildOutcome::Fallback`] and logged as a warning.
//!
//! ## Draw time
//!
//! [`ShaderGenerator::notify_render_single_object`] refreshes auto constants
//! and lets every sub-render-state push its per-object values. It neither
//! allocates parameters nor touches source.

use std::sync::Arc;

use loom_core::{ConfigError, LoomError, hash_combine};
use loom_material::{Light, Pass, Renderable};
use loom_shader::{AutoParamDataSource, GpuProgramParameters, ProgramSet, ProgramWriter};
use rustc_hash::FxHashMap;

use crate::cache::{CacheKey, ProgramCache, ProgramSetId};
use crate::compiler::ProgramCompiler;
use crate::registry::{self, SubRenderStateRegistry};
use crate::render_state::RenderState;
use crate::settings::GeneratorSettings;
use crate::sub_render_state::{PassContext, UpdateContext};

/// User-object key under which generated state is attached to a pass.
pub const GENERATED_PASS_KEY: &str = "loom.rtss.generated";

/// Generated state of one pass for one scheme.
#[derive(Debug)]
pub struct GeneratedPass {
    pub render_state: RenderState,
    pub program_set: ProgramSetId,
    pub programs: ProgramSet,
    pub vertex_params: GpuProgramParameters,
    pub fragment_params: GpuProgramParameters,
    /// Renderable hash folded with the render-state hash.
    pub hash: u64,
}

/// Generated state of one pass, per scheme.
#[derive(Debug, Default)]
pub struct GeneratedPasses {
    schemes: FxHashMap<String, GeneratedPass>,
}

impl GeneratedPasses {
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<&GeneratedPass> {
        self.schemes.get(scheme)
    }

    pub fn get_mut(&mut self, scheme: &str) -> Option<&mut GeneratedPass> {
        self.schemes.get_mut(scheme)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

/// Result of [`ShaderGenerator::build_pass`].
#[derive(Debug)]
pub enum PassBuildOutcome {
    Generated {
        program_set: ProgramSetId,
        hash: u64,
        /// The programs came from the L1 cache.
        cache_hit: bool,
    },
    /// Generation failed; the pass keeps its previous rendering path.
    Fallback {
        /// Type name of the failing sub-render-state, if one failed.
        sub_state: Option<&'static str>,
        reason: LoomError,
    },
}

impl PassBuildOutcome {
    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    #[must_use]
    pub fn program_set(&self) -> Option<ProgramSetId> {
        match self {
            Self::Generated { program_set, .. } => Some(*program_set),
            Self::Fallback { .. } => None,
        }
    }
}

pub struct ShaderGenerator {
    registry: Arc<SubRenderStateRegistry>,
    settings: GeneratorSettings,
    writer: ProgramWriter,
    compiler: Box<dyn ProgramCompiler>,
    cache: ProgramCache,
    /// Per-scheme render states overlaid on every composed pass.
    templates: FxHashMap<String, RenderState>,
}

impl std::fmt::Debug for ShaderGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderGenerator")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("cached_programs", &self.cache.len())
            .field("schemes", &self.templates.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ShaderGenerator {
    #[must_use]
    pub fn new(
        registry: Arc<SubRenderStateRegistry>,
        settings: GeneratorSettings,
        compiler: Box<dyn ProgramCompiler>,
    ) -> Self {
        let writer = ProgramWriter::new(settings.target_language, settings.inline_libraries);
        Self {
            registry,
            settings,
            writer,
            compiler,
            cache: ProgramCache::new(),
            templates: FxHashMap::default(),
        }
    }

    /// A generator using the process-wide registry.
    pub fn from_global(
        settings: GeneratorSettings,
        compiler: Box<dyn ProgramCompiler>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(registry::global()?, settings, compiler))
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SubRenderStateRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Drops every compiled program. Passes built earlier must be rebuilt.
    pub fn clear_cache(&mut self) {
        log::info!("Clearing {} cached program sets", self.cache.len());
        self.cache.clear();
    }

    /// Sets the render state overlaid on every pass built for `scheme`.
    /// A template entry replaces the configuration of the first composed
    /// instance with the same type name, or is added when none exists.
    pub fn set_scheme_template(&mut self, scheme: &str, template: RenderState) {
        self.templates.insert(scheme.to_string(), template);
    }

    #[must_use]
    pub fn scheme_template(&self, scheme: &str) -> Option<&RenderState> {
        self.templates.get(scheme)
    }

    pub fn remove_scheme_template(&mut self, scheme: &str) -> Option<RenderState> {
        self.templates.remove(scheme)
    }

    /// Builds the render state `pass` would get in `scheme`, without
    /// generating anything.
    pub fn compose(&self, pass: &Pass, scheme: &str) -> Result<RenderState, ConfigError> {
        let mut render_state = RenderState::new();

        for factory in self.registry.factories() {
            for slot in 0..factory.instances_for_pass(pass) {
                let mut instance = factory.create_instance();
                let ctx = PassContext {
                    pass,
                    slot,
                    render_state: &render_state,
                    settings: &self.settings,
                };
                if instance.pre_add_to_render_state(&ctx)? {
                    render_state.add_sub_render_state(instance);
                } else {
                    log::trace!("`{}` does not apply to pass `{}`", factory.type_name(), pass.name);
                }
            }
        }

        if let Some(template) = self.templates.get(scheme) {
            for sub_state in template.sub_states() {
                if let Some(existing) = render_state.find_mut(sub_state.type_name()) {
                    existing.copy_from(sub_state);
                } else {
                    let mut instance = self.registry.create_instance(sub_state.type_name())?;
                    instance.copy_from(sub_state);
                    render_state.add_sub_render_state(instance);
                }
            }
        }

        Ok(render_state)
    }

    /// Generates programs for `pass` in `scheme` and attaches the generated
    /// state to the pass.
    ///
    /// `renderable_hash` distinguishes renderable kinds that need different
    /// programs for the same pass, e.g. skinned and static meshes.
    pub fn build_pass(
        &mut self,
        pass: &mut Pass,
        scheme: &str,
        renderable_hash: u64,
    ) -> Result<PassBuildOutcome, ConfigError> {
        let mut render_state = self.compose(pass, scheme)?;

        let programs = match render_state.create_program_set() {
            Ok(programs) => programs,
            Err(failure) => {
                log::warn!(
                    "Pass `{}` ({scheme}) falls back: {failure}",
                    pass.name
                );
                self.invalidate_pass(pass, scheme);
                return Ok(PassBuildOutcome::Fallback {
                    sub_state: Some(failure.sub_state),
                    reason: failure.error.into(),
                });
            }
        };

        let pass_hash = render_state.hash_code();
        let hash = hash_combine(renderable_hash, pass_hash);

        let (program_set, cache_hit) = if let Some(id) = self.cache.lookup(hash) {
            log::debug!("Pass `{}` ({scheme}) hit program cache {hash:#018x}", pass.name);
            (id, true)
        } else {
            let key = CacheKey {
                renderable: renderable_hash,
                pass: pass_hash,
                final_hash: hash,
            };
            match self.write_and_compile(&programs, key) {
                Ok(id) => {
                    log::info!(
                        "Generated programs for pass `{}` ({scheme}): {} sub-render-states, hash {hash:#018x}",
                        pass.name,
                        render_state.len()
                    );
                    (id, false)
                }
                Err(reason) => {
                    log::warn!("Pass `{}` ({scheme}) falls back: {reason}", pass.name);
                    self.invalidate_pass(pass, scheme);
                    return Ok(PassBuildOutcome::Fallback {
                        sub_state: None,
                        reason,
                    });
                }
            }
        };

        let generated = GeneratedPass {
            vertex_params: GpuProgramParameters::from_program(programs.vertex()),
            fragment_params: GpuProgramParameters::from_program(programs.fragment()),
            render_state,
            program_set,
            programs,
            hash,
        };
        let mut passes = pass
            .user_objects
            .take::<GeneratedPasses>(GENERATED_PASS_KEY)
            .unwrap_or_default();
        passes.schemes.insert(scheme.to_string(), generated);
        pass.user_objects.restore(GENERATED_PASS_KEY, passes);

        Ok(PassBuildOutcome::Generated {
            program_set,
            hash,
            cache_hit,
        })
    }

    fn write_and_compile(&mut self, programs: &ProgramSet, key: CacheKey) -> Result<ProgramSetId, LoomError> {
        let source = self.writer.write_program_set(programs)?;
        if self.settings.dump_generated_source {
            log::debug!(
                "Generated vertex program {:#018x}:\n{}",
                key.final_hash,
                source.vertex
            );
            log::debug!(
                "Generated fragment program {:#018x}:\n{}",
                key.final_hash,
                source.fragment
            );
        }
        self.cache.insert(key, &source, self.compiler.as_mut())
    }

    /// Drops the generated state of `pass` for `scheme`. Returns false if
    /// there was none.
    pub fn invalidate_pass(&self, pass: &mut Pass, scheme: &str) -> bool {
        pass.user_objects
            .get_mut::<GeneratedPasses>(GENERATED_PASS_KEY)
            .is_some_and(|passes| passes.schemes.remove(scheme).is_some())
    }

    /// Generated state of `pass` for `scheme`.
    #[must_use]
    pub fn generated_pass<'a>(&self, pass: &'a Pass, scheme: &str) -> Option<&'a GeneratedPass> {
        pass.user_objects
            .get::<GeneratedPasses>(GENERATED_PASS_KEY)?
            .get(scheme)
    }

    /// Pushes per-object values for `renderable` into the generated
    /// parameters of `pass`. Does nothing for passes without generated state.
    pub fn notify_render_single_object(
        &self,
        renderable: &dyn Renderable,
        pass: &mut Pass,
        scheme: &str,
        auto_source: &AutoParamDataSource,
        lights: &[Light],
    ) {
        let Some(mut passes) = pass.user_objects.take::<GeneratedPasses>(GENERATED_PASS_KEY) else {
            return;
        };

        if let Some(generated) = passes.schemes.get_mut(scheme) {
            let GeneratedPass {
                render_state,
                vertex_params,
                fragment_params,
                ..
            } = generated;
            let pass: &Pass = pass;
            vertex_params.update_auto_params(auto_source, renderable, pass);
            fragment_params.update_auto_params(auto_source, renderable, pass);

            let mut ctx = UpdateContext {
                renderable,
                pass,
                auto_source,
                lights,
                vertex_params,
                fragment_params,
            };
            for sub_state in render_state.sub_states_mut() {
                sub_state.update_gpu_programs_params(&mut ctx);
            }
        }

        pass.user_objects.restore(GENERATED_PASS_KEY, passes);
    }
}
