//! The authored material state the shader generator reads.
//!
//! Passes, texture units, blend modes and texture effects are plain data. The
//! generator never mutates them except through [`UserObjectBindings`], which
//! carries the generated per-pass state between composition and draw time.

pub mod blend;
pub mod pass;
pub mod scene;
pub mod terrain;
pub mod texture_unit;
pub mod user_objects;

pub use blend::{CompareFunction, LayerBlendModeEx, LayerBlendOperationEx, LayerBlendSource, LayerBlendType};
pub use pass::{AlphaRejectSettings, Pass, SurfaceColours};
pub use scene::{Light, LightCount, LightKind, Projector, Renderable};
pub use terrain::{TerrainAlignment, TerrainLayer, TerrainLayerSet};
pub use texture_unit::{
    BindingType, EnvMapType, MAX_TEXTURE_COORD_SETS, TextureEffect, TextureEffectType, TextureId,
    TextureTransformKind, TextureType, TextureUnitState,
};
pub use user_objects::UserObjectBindings;
