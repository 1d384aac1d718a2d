//! A single rendering pass of a material.

use glam::{Vec3, Vec4};

use crate::blend::CompareFunction;
use crate::scene::LightCount;
use crate::terrain::TerrainLayerSet;
use crate::texture_unit::TextureUnitState;
use crate::user_objects::UserObjectBindings;

/// Fragment rejection based on the output alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlphaRejectSettings {
    pub function: CompareFunction,
    /// Reference value in `0..=255`.
    pub value: u8,
}

impl AlphaRejectSettings {
    /// The reference value normalised to `[0, 1]`.
    #[must_use]
    pub fn normalized_value(&self) -> f32 {
        f32::from(self.value) / 255.0
    }
}

/// Material colours read by fixed-function lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceColours {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
}

impl Default for SurfaceColours {
    fn default() -> Self {
        Self {
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

impl SurfaceColours {
    /// Specular highlights need a positive shininess and a non-black colour.
    #[must_use]
    pub fn has_specular(&self) -> bool {
        self.shininess > 0.0 && self.specular.truncate() != Vec3::ZERO
    }
}

#[derive(Debug, Default)]
pub struct Pass {
    pub name: String,
    pub texture_units: Vec<TextureUnitState>,
    pub alpha_reject: AlphaRejectSettings,
    /// Use the per-vertex colour as the diffuse colour.
    pub vertex_colour_tracking: bool,
    /// Add the specular colour after texturing.
    pub specular_enabled: bool,
    /// Per-vertex fixed-function lighting.
    pub lighting_enabled: bool,
    pub surface: SurfaceColours,
    /// Light slots of a lit pass. Unset means the generator default.
    pub light_count: Option<LightCount>,
    /// Present on passes rendering terrain pages.
    pub terrain: Option<TerrainLayerSet>,
    /// Subsystem state attached to the pass, e.g. generated shader state.
    pub user_objects: UserObjectBindings,
}

impl Pass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_texture_unit(mut self, unit: TextureUnitState) -> Self {
        self.texture_units.push(unit);
        self
    }

    #[must_use]
    pub fn with_alpha_reject(mut self, function: CompareFunction, value: u8) -> Self {
        self.alpha_reject = AlphaRejectSettings { function, value };
        self
    }

    /// Enables lighting with the given material colours.
    #[must_use]
    pub fn with_lighting(mut self, surface: SurfaceColours) -> Self {
        self.lighting_enabled = true;
        self.surface = surface;
        self
    }

    #[must_use]
    pub fn with_light_count(mut self, count: LightCount) -> Self {
        self.light_count = Some(count);
        self
    }

    /// True when lighting produces a specular term for this pass.
    #[must_use]
    pub fn lit_specular(&self) -> bool {
        self.lighting_enabled && self.surface.has_specular()
    }

    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainLayerSet) -> Self {
        self.terrain = Some(terrain);
        self
    }
}
