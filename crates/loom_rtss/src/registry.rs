//! Sub-Render-State Registry
//!
//! Factories are registered by type name. A registry is usually built once
//! at startup, installed as the process-wide instance with [`initialize`],
//! read through [`global`] and torn down with [`shutdown`]. Generators can
//! also be handed an explicit registry, which is what tests do.
//!
//! ```rust,ignore
//! let mut registry = SubRenderStateRegistry::with_builtin_factories();
//! registry.register(Box::new(MyEffectFactory))?;
//! loom_rtss::registry::initialize(registry)?;
//!
//! let generator = ShaderGenerator::from_global(settings, Box::new(PassthroughCompiler::default()))?;
//! ```

use std::sync::Arc;

use loom_core::ConfigError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ffp::{
    alpha_test::AlphaTestFactory, colour::FfpColourFactory, lighting::FfpLightingFactory,
    texture_stage::TextureStageFactory, transform::FfpTransformFactory,
};
use crate::sub_render_state::{SubRenderState, SubRenderStateFactory};
use crate::terrain::{surface::TerrainSurfaceFactory, transform::TerrainTransformFactory};

static GLOBAL_REGISTRY: RwLock<Option<Arc<SubRenderStateRegistry>>> = RwLock::new(None);

#[derive(Default)]
pub struct SubRenderStateRegistry {
    factories: Vec<Box<dyn SubRenderStateFactory>>,
    by_name: FxHashMap<&'static str, usize>,
}

impl std::fmt::Debug for SubRenderStateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.factories.iter().map(|factory| factory.type_name()))
            .finish()
    }
}

impl SubRenderStateRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the fixed-function and terrain factories.
    #[must_use]
    pub fn with_builtin_factories() -> Self {
        let mut registry = Self::new();
        let builtin: [Box<dyn SubRenderStateFactory>; 7] = [
            Box::new(FfpTransformFactory),
            Box::new(FfpColourFactory),
            Box::new(FfpLightingFactory),
            Box::new(TextureStageFactory),
            Box::new(AlphaTestFactory),
            Box::new(TerrainTransformFactory),
            Box::new(TerrainSurfaceFactory),
        ];
        for factory in builtin {
            registry.insert(factory);
        }
        registry
    }

    /// Adds a factory. Type names are unique.
    pub fn register(&mut self, factory: Box<dyn SubRenderStateFactory>) -> Result<(), ConfigError> {
        if self.by_name.contains_key(factory.type_name()) {
            return Err(ConfigError::DuplicateFactory(factory.type_name().to_string()));
        }
        self.insert(factory);
        Ok(())
    }

    fn insert(&mut self, factory: Box<dyn SubRenderStateFactory>) {
        log::debug!("Registered sub-render-state factory `{}`", factory.type_name());
        self.by_name.insert(factory.type_name(), self.factories.len());
        self.factories.push(factory);
    }

    #[must_use]
    pub fn factory(&self, type_name: &str) -> Option<&dyn SubRenderStateFactory> {
        self.by_name
            .get(type_name)
            .map(|&index| self.factories[index].as_ref())
    }

    /// Creates a fresh instance of `type_name`.
    pub fn create_instance(&self, type_name: &str) -> Result<Box<dyn SubRenderState>, ConfigError> {
        self.factory(type_name)
            .map(|factory| factory.create_instance())
            .ok_or_else(|| ConfigError::UnknownFactory(type_name.to_string()))
    }

    /// Factories in registration order.
    pub fn factories(&self) -> impl Iterator<Item = &dyn SubRenderStateFactory> {
        self.factories.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

// ─── Process-wide Instance ───────────────────────────────────────────────────

/// Installs `registry` as the process-wide registry.
pub fn initialize(registry: SubRenderStateRegistry) -> Result<(), ConfigError> {
    let mut slot = GLOBAL_REGISTRY.write();
    if slot.is_some() {
        return Err(ConfigError::RegistryAlreadyInitialized);
    }
    *slot = Some(Arc::new(registry));
    Ok(())
}

/// The process-wide registry.
pub fn global() -> Result<Arc<SubRenderStateRegistry>, ConfigError> {
    GLOBAL_REGISTRY
        .read()
        .clone()
        .ok_or(ConfigError::RegistryNotInitialized)
}

#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL_REGISTRY.read().is_some()
}

/// Drops the process-wide registry. Generators created earlier keep their
/// own handle. Returns false if nothing was installed.
pub fn shutdown() -> bool {
    GLOBAL_REGISTRY.write().take().is_some()
}
