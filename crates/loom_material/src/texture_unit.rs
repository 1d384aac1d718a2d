//! Per-layer texture state.

use glam::Mat4;
use loom_core::ConfigError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::blend::{LayerBlendModeEx, LayerBlendOperationEx, LayerBlendSource, LayerBlendType};
use crate::scene::Projector;

/// Number of texture coordinate sets a vertex may carry.
pub const MAX_TEXTURE_COORD_SETS: u32 = 8;

/// Opaque handle to a texture owned by the engine's texture manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureType {
    Tex1D,
    #[default]
    Tex2D,
    Tex3D,
    CubeMap,
}

/// The pipeline stage a texture unit is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingType {
    #[default]
    Fragment,
    Vertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMapType {
    /// Sphere map.
    Curved,
    Planar,
    Reflection,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureTransformKind {
    TranslateU,
    TranslateV,
    ScaleU,
    ScaleV,
    Rotate,
}

/// Effect kinds, ordered the way effects are iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureEffectType {
    EnvironmentMap,
    ProjectiveTexture,
    UvScroll,
    UScroll,
    VScroll,
    Rotate,
    Transform,
}

/// A texture coordinate effect attached to a texture unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureEffect {
    EnvironmentMap(EnvMapType),
    /// Projects the texture from a frustum. `None` until a projector is bound.
    ProjectiveTexture(Option<Projector>),
    UvScroll { u_speed: f32, v_speed: f32 },
    UScroll(f32),
    VScroll(f32),
    Rotate(f32),
    Transform {
        kind: TextureTransformKind,
        base: f32,
        frequency: f32,
        phase: f32,
        amplitude: f32,
    },
}

impl TextureEffect {
    #[must_use]
    pub const fn effect_type(&self) -> TextureEffectType {
        match self {
            Self::EnvironmentMap(_) => TextureEffectType::EnvironmentMap,
            Self::ProjectiveTexture(_) => TextureEffectType::ProjectiveTexture,
            Self::UvScroll { .. } => TextureEffectType::UvScroll,
            Self::UScroll(_) => TextureEffectType::UScroll,
            Self::VScroll(_) => TextureEffectType::VScroll,
            Self::Rotate(_) => TextureEffectType::Rotate,
            Self::Transform { .. } => TextureEffectType::Transform,
        }
    }
}

/// Authored state of one texture layer of a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUnitState {
    pub name: String,
    pub texture: Option<TextureId>,
    pub texture_type: TextureType,
    pub binding_type: BindingType,
    pub colour_blend: LayerBlendModeEx,
    pub alpha_blend: LayerBlendModeEx,
    /// Static transform applied on top of any animated effect.
    pub texture_transform: Mat4,
    tex_coord_set: u32,
    /// Kept sorted by effect type; equal types keep insertion order.
    effects: SmallVec<[TextureEffect; 2]>,
}

impl Default for TextureUnitState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureUnitState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            texture: None,
            texture_type: TextureType::Tex2D,
            binding_type: BindingType::Fragment,
            colour_blend: LayerBlendModeEx::new(LayerBlendType::Colour),
            alpha_blend: LayerBlendModeEx::new(LayerBlendType::Alpha),
            texture_transform: Mat4::IDENTITY,
            tex_coord_set: 0,
            effects: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_texture(mut self, texture: TextureId, texture_type: TextureType) -> Self {
        self.texture = Some(texture);
        self.texture_type = texture_type;
        self
    }

    #[inline]
    #[must_use]
    pub fn tex_coord_set(&self) -> u32 {
        self.tex_coord_set
    }

    pub fn set_tex_coord_set(&mut self, set: u32) -> Result<(), ConfigError> {
        if set >= MAX_TEXTURE_COORD_SETS {
            return Err(ConfigError::UvSetOutOfRange {
                set,
                max: MAX_TEXTURE_COORD_SETS - 1,
            });
        }
        self.tex_coord_set = set;
        Ok(())
    }

    pub fn set_colour_operation_ex(
        &mut self,
        operation: LayerBlendOperationEx,
        source1: LayerBlendSource,
        source2: LayerBlendSource,
    ) {
        self.colour_blend = self.colour_blend.with_operation(operation, source1, source2);
    }

    pub fn set_alpha_operation_ex(
        &mut self,
        operation: LayerBlendOperationEx,
        source1: LayerBlendSource,
        source2: LayerBlendSource,
    ) {
        self.alpha_blend = self.alpha_blend.with_operation(operation, source1, source2);
    }

    /// Applies a textual `colour_op_ex` line.
    pub fn set_colour_op_ex_str(&mut self, line: &str) -> Result<(), ConfigError> {
        self.colour_blend = LayerBlendModeEx::parse(LayerBlendType::Colour, line)?;
        Ok(())
    }

    /// Applies a textual `alpha_op_ex` line.
    pub fn set_alpha_op_ex_str(&mut self, line: &str) -> Result<(), ConfigError> {
        self.alpha_blend = LayerBlendModeEx::parse(LayerBlendType::Alpha, line)?;
        Ok(())
    }

    /// Adds an effect, keeping effects ordered by type.
    pub fn add_effect(&mut self, effect: TextureEffect) {
        let ty = effect.effect_type();
        let at = self.effects.partition_point(|e| e.effect_type() <= ty);
        self.effects.insert(at, effect);
    }

    /// Removes every effect of the given type.
    pub fn remove_effects(&mut self, ty: TextureEffectType) {
        self.effects.retain(|e| e.effect_type() != ty);
    }

    #[inline]
    #[must_use]
    pub fn effects(&self) -> &[TextureEffect] {
        &self.effects
    }

    /// Binds a projector to every projective effect on this unit.
    pub fn set_projector(&mut self, projector: Projector) {
        for effect in &mut self.effects {
            if let TextureEffect::ProjectiveTexture(slot) = effect {
                *slot = Some(projector);
            }
        }
    }
}
