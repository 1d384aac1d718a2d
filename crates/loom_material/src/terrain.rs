//! Terrain layer description consumed by the terrain sub-render-states.
//!
//! Tessellation and LOD selection live elsewhere; this is only what the
//! terrain shaders need: how many layers, which textures, and how densely
//! each layer tiles.

use glam::Vec4;
use loom_core::HashFolder;
use serde::{Deserialize, Serialize};

use crate::texture_unit::TextureId;

/// Which world axis the terrain height runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainAlignment {
    /// Terrain lies in the XZ plane, height is Y.
    #[default]
    AlignXZ,
    /// Terrain lies in the XY plane, height is Z.
    AlignXY,
    /// Terrain lies in the YZ plane, height is X.
    AlignYZ,
}

impl TerrainAlignment {
    /// Swizzle component holding the height of a world position.
    #[must_use]
    pub const fn height_component(self) -> &'static str {
        match self {
            Self::AlignXZ => "y",
            Self::AlignXY => "z",
            Self::AlignYZ => "x",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    pub diffuse: TextureId,
    /// World-space size covered by one repeat of the layer texture.
    pub world_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayerSet {
    pub layers: Vec<TerrainLayer>,
    /// Blend maps; each holds the weights of four layers after the first.
    pub blend_maps: Vec<TextureId>,
    pub global_normal_map: Option<TextureId>,
    pub terrain_world_size: f32,
    pub alignment: TerrainAlignment,
    pub lod_morph: bool,
}

impl TerrainLayerSet {
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Blend textures needed for the layer count: the first layer is the base
    /// and needs no weight.
    #[must_use]
    pub fn blend_texture_count(&self) -> u32 {
        let layers = self.layer_count();
        if layers <= 1 { 0 } else { (layers - 2) / 4 + 1 }
    }

    /// Number of packed `uvMul` vectors, one per four layers.
    #[must_use]
    pub fn uv_multiplier_count(&self) -> u32 {
        self.layer_count().div_ceil(4)
    }

    /// How often layer `index` repeats across the whole terrain.
    #[must_use]
    pub fn uv_multiplier(&self, index: usize) -> f32 {
        self.layers.get(index).map_or(1.0, |layer| {
            if layer.world_size > 0.0 {
                self.terrain_world_size / layer.world_size
            } else {
                1.0
            }
        })
    }

    /// UV multipliers of layers `4 * group .. 4 * group + 4`, zero padded.
    #[must_use]
    pub fn packed_uv_multipliers(&self, group: usize) -> Vec4 {
        let mut packed = [0.0f32; 4];
        for (channel, slot) in packed.iter_mut().enumerate() {
            let layer = group * 4 + channel;
            if layer < self.layers.len() {
                *slot = self.uv_multiplier(layer);
            }
        }
        Vec4::from_array(packed)
    }

    /// Hash of every texture bound by the terrain surface shader.
    #[must_use]
    pub fn texture_hash(&self) -> u64 {
        let mut folder = HashFolder::new();
        folder.fold(&self.global_normal_map);
        for map in &self.blend_maps {
            folder.fold(map);
        }
        for layer in &self.layers {
            folder.fold(&layer.diffuse);
        }
        folder.finish()
    }
}
