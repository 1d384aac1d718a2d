//! Narrow interfaces to the scene collaborators the generator reads at draw time.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// An object about to be drawn with a generated pass.
pub trait Renderable {
    /// Object-to-world transform.
    fn world_matrix(&self) -> Mat4;

    /// Value of a custom auto parameter, e.g. the terrain LOD morph factor.
    fn custom_parameter(&self, _index: u32) -> Option<Vec4> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightKind {
    #[default]
    Directional,
    Point,
    Spot,
}

/// A scene light as seen by per-object parameter updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    /// Direction the light travels, in world space.
    pub direction: Vec3,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// `(range, constant, linear, quadratic)`.
    pub attenuation: Vec4,
    /// Full cone angles in radians, inner then outer.
    pub spot_angles: Vec2,
    pub spot_falloff: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            diffuse: Vec4::ONE,
            specular: Vec4::ZERO,
            attenuation: Vec4::new(100_000.0, 1.0, 0.0, 0.0),
            spot_angles: Vec2::new(30f32.to_radians(), 40f32.to_radians()),
            spot_falloff: 1.0,
        }
    }
}

impl Light {
    #[must_use]
    pub fn directional(direction: Vec3, diffuse: Vec4) -> Self {
        Self {
            kind: LightKind::Directional,
            direction: direction.normalize_or_zero(),
            diffuse,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn point(position: Vec3, diffuse: Vec4) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            diffuse,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn spot(position: Vec3, direction: Vec3, diffuse: Vec4) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            direction: direction.normalize_or_zero(),
            diffuse,
            ..Default::default()
        }
    }

    /// Stands in for a light slot with no matching scene light. Contributes
    /// nothing: black colours and zero range.
    #[must_use]
    pub fn blank(kind: LightKind) -> Self {
        Self {
            kind,
            diffuse: Vec4::ZERO,
            specular: Vec4::ZERO,
            attenuation: Vec4::new(0.0, 1.0, 0.0, 0.0),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_specular(mut self, specular: Vec4) -> Self {
        self.specular = specular;
        self
    }

    #[must_use]
    pub fn with_attenuation(mut self, range: f32, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.attenuation = Vec4::new(range, constant, linear, quadratic);
        self
    }

    #[must_use]
    pub fn with_spot_cone(mut self, inner: f32, outer: f32, falloff: f32) -> Self {
        self.spot_angles = Vec2::new(inner, outer);
        self.spot_falloff = falloff;
        self
    }

    /// `(cos(inner / 2), cos(outer / 2), falloff)`.
    #[must_use]
    pub fn spot_params(&self) -> Vec3 {
        let half = self.spot_angles * 0.5;
        Vec3::new(half.x.cos(), half.y.cos(), self.spot_falloff)
    }
}

/// Number of lights of each kind a lit pass is generated for.
///
/// Light slots are laid out points first, then directional lights, then
/// spot lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LightCount {
    pub point: u32,
    pub directional: u32,
    pub spot: u32,
}

impl Default for LightCount {
    fn default() -> Self {
        Self {
            point: 0,
            directional: 1,
            spot: 0,
        }
    }
}

impl LightCount {
    #[must_use]
    pub const fn new(point: u32, directional: u32, spot: u32) -> Self {
        Self {
            point,
            directional,
            spot,
        }
    }

    #[must_use]
    pub const fn total(self) -> u32 {
        self.point + self.directional + self.spot
    }

    /// One kind per light slot, in slot order.
    pub fn kinds(self) -> impl Iterator<Item = LightKind> {
        let repeat = |kind, n: u32| std::iter::repeat_n(kind, n as usize);
        repeat(LightKind::Point, self.point)
            .chain(repeat(LightKind::Directional, self.directional))
            .chain(repeat(LightKind::Spot, self.spot))
    }
}

/// The frustum a projective texture is cast from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl Projector {
    /// Maps clip space `[-1, 1]` to texture space `[0, 1]` with a flipped V axis.
    pub const CLIP_SPACE_TO_IMAGE_SPACE: Mat4 = Mat4::from_cols_array(&[
        0.5, 0.0, 0.0, 0.0, //
        0.0, -0.5, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.5, 0.5, 0.0, 1.0, //
    ]);

    /// World space to projective texture space.
    #[must_use]
    pub fn view_proj_image_matrix(&self) -> Mat4 {
        Self::CLIP_SPACE_TO_IMAGE_SPACE * self.projection * self.view
    }
}
