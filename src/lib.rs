//! # Loom
//!
//! Run-time shader generation for material passes.
//!
//! A pass is described by plain material data (texture units, blend modes,
//! alpha rejection, terrain layers). Loom composes the features that apply to
//! it into a render state, synthesizes matching GLSL vertex and fragment
//! programs, compiles them once per distinct configuration and keeps their
//! uniforms up to date for every drawn object.
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | errors, hash folding, string interning |
//! | [`material`] | passes, texture units, blend modes, terrain layers |
//! | [`shader`] | program IR, parameter registry, GLSL writer, GPU parameters |
//! | [`rtss`] | sub-render-states, composition, program cache |
//!
//! ## Example
//!
//! ```rust,ignore
//! use loom::prelude::*;
//!
//! let mut generator = ShaderGenerator::new(
//!     Arc::new(SubRenderStateRegistry::with_builtin_factories()),
//!     GeneratorSettings::default(),
//!     Box::new(PassthroughCompiler::default()),
//! );
//!
//! let mut pass = Pass::new("diffuse")
//!     .with_texture_unit(TextureUnitState::new().with_texture(TextureId(1), TextureType::Tex2D));
//! generator.build_pass(&mut pass, DEFAULT_SCHEME_NAME, 0)?;
//! ```

pub use loom_core as core;
pub use loom_material as material;
pub use loom_rtss as rtss;
pub use loom_shader as shader;

pub use loom_core::{ConfigError, LoomError, ResolveError, Result};

pub mod prelude {
    pub use std::sync::Arc;

    pub use loom_core::{ConfigError, LoomError, ResolveError};
    pub use loom_material::{
        BindingType, CompareFunction, EnvMapType, LayerBlendOperationEx, LayerBlendSource, Light, LightCount,
        Pass, Projector, Renderable, SurfaceColours, TerrainAlignment, TerrainLayer, TerrainLayerSet,
        TextureEffect, TextureId, TextureType, TextureUnitState,
    };
    pub use loom_rtss::{
        DEFAULT_SCHEME_NAME, GeneratorSettings, PassBuildOutcome, PassthroughCompiler, ProgramCompiler,
        RenderState, ShaderGenerator, SubRenderState, SubRenderStateFactory, SubRenderStateRegistry,
    };
    pub use loom_shader::{AutoParamDataSource, ProgramSet, TargetLanguage};
}
