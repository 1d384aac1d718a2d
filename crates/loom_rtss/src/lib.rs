//! Run-time shader system.
//!
//! Composes the sub-render-states that apply to a material pass into a
//! [`RenderState`], generates the matching vertex and fragment programs,
//! caches the compiled result and keeps per-object uniforms current.
//!
//! ```rust,ignore
//! use loom_rtss::{GeneratorSettings, PassthroughCompiler, ShaderGenerator, SubRenderStateRegistry};
//!
//! let mut generator = ShaderGenerator::new(
//!     Arc::new(SubRenderStateRegistry::with_builtin_factories()),
//!     GeneratorSettings::default(),
//!     Box::new(PassthroughCompiler::default()),
//! );
//! let outcome = generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0)?;
//! // per drawn object:
//! generator.notify_render_single_object(&mesh, &mut pass, DEFAULT_SCHEME_NAME, &auto_source, &lights);
//! ```

pub mod cache;
pub mod compiler;
pub mod ffp;
pub mod generator;
pub mod registry;
pub mod render_state;
pub mod settings;
pub mod sub_render_state;
pub mod terrain;

pub use cache::{CacheKey, CachedProgramSet, ProgramCache, ProgramSetId};
pub use compiler::{GpuProgramHandle, PassthroughCompiler, ProgramCompiler};
pub use generator::{GENERATED_PASS_KEY, GeneratedPass, GeneratedPasses, PassBuildOutcome, ShaderGenerator};
pub use registry::SubRenderStateRegistry;
pub use render_state::{GenerationFailure, RenderState};
pub use settings::{DEFAULT_SCHEME_NAME, GeneratorSettings};
pub use sub_render_state::{
    PassContext, SubRenderState, SubRenderStateFactory, UpdateContext, base_hash, create_cpu_sub_programs,
    downcast_sub_state,
};
