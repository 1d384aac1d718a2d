//! Terrain shading.
//!
//! Terrain passes replace the fixed-function transform and colour stages:
//! [`transform::TerrainTransform`] morphs vertices between LOD levels and
//! [`surface::TerrainSurface`] blends the diffuse layers through the blend
//! maps and lights the result from the global normal map.

pub mod surface;
pub mod transform;

pub const TERRAIN_TRANSFORM_TYPE: &str = "Terrain_Transform";
pub const TERRAIN_SURFACE_TYPE: &str = "Terrain_Surface";

pub const TERRAIN_TRANSFORM: i32 = 100;
pub const TERRAIN_SURFACE: i32 = 400;

pub const TERRAIN_VS_TRANSFORM: i32 = 100;
pub const TERRAIN_PS_SURFACE: i32 = 1000;

pub const TERRAIN_LIB_TRANSFORMS: &str = "TerrainTransforms";
pub const TERRAIN_LIB_SURFACE: &str = "TerrainSurface";

pub const TERRAIN_FUNC_LOD_MORPH: &str = "applyLODMorph";
pub const TERRAIN_FUNC_FETCH_NORMAL: &str = "SGX_FetchNormal";
pub const TERRAIN_FUNC_BLEND_LAYER: &str = "blendTerrainLayer";
pub const TERRAIN_FUNC_LAMBERT: &str = "SGX_TerrainLambert";

/// Custom auto parameter carrying `(lod threshold, morph factor)` of a
/// terrain tile.
pub const LOD_MORPH_PARAM_INDEX: u32 = 1001;
