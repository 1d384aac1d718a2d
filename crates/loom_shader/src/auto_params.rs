//! Source of the values behind auto constants.

use glam::{Mat4, Vec4};
use loom_material::{Pass, Renderable};

use crate::parameter::{AutoBinding, AutoConstantType};

/// Texture units addressable by `texture_matrix` auto constants.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// Per-frame camera, lighting and texture state the engine exposes to
/// generated programs. Per-object values come from the [`Renderable`] being
/// drawn.
#[derive(Debug, Clone)]
pub struct AutoParamDataSource {
    view: Mat4,
    projection: Mat4,
    ambient_light: Vec4,
    texture_matrices: [Mat4; MAX_TEXTURE_UNITS],
}

impl Default for AutoParamDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoParamDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1.0),
            texture_matrices: [Mat4::IDENTITY; MAX_TEXTURE_UNITS],
        }
    }

    pub fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }

    pub fn set_ambient_light(&mut self, colour: Vec4) {
        self.ambient_light = colour;
    }

    /// Sets the current (possibly animated) transform of a texture unit.
    /// Units beyond [`MAX_TEXTURE_UNITS`] are ignored.
    pub fn set_texture_matrix(&mut self, unit: usize, matrix: Mat4) {
        if let Some(slot) = self.texture_matrices.get_mut(unit) {
            *slot = matrix;
        }
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    #[must_use]
    pub fn ambient_light(&self) -> Vec4 {
        self.ambient_light
    }

    /// Ambient and emissive contribution of `pass`, before any light.
    #[must_use]
    pub fn derived_scene_colour(&self, pass: &Pass) -> Vec4 {
        let surface = &pass.surface;
        let rgb = self.ambient_light.truncate() * surface.ambient.truncate() + surface.emissive.truncate();
        rgb.extend(surface.diffuse.w)
    }

    #[must_use]
    pub fn texture_matrix(&self, unit: usize) -> Mat4 {
        self.texture_matrices
            .get(unit)
            .copied()
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Writes the value of `binding` into `dst`, truncating to its length.
    pub fn write_auto_constant(
        &self,
        binding: AutoBinding,
        renderable: &dyn Renderable,
        pass: &Pass,
        dst: &mut [f32],
    ) {
        match binding.kind {
            AutoConstantType::WorldMatrix => write_matrix(renderable.world_matrix(), dst),
            AutoConstantType::InverseTransposeWorldMatrix => {
                write_matrix(renderable.world_matrix().inverse().transpose(), dst);
            }
            AutoConstantType::ViewMatrix => write_matrix(self.view, dst),
            AutoConstantType::InverseTransposeViewMatrix => {
                write_matrix(self.view.inverse().transpose(), dst);
            }
            AutoConstantType::ViewProjMatrix => write_matrix(self.projection * self.view, dst),
            AutoConstantType::WorldViewProjMatrix => {
                write_matrix(self.projection * self.view * renderable.world_matrix(), dst);
            }
            AutoConstantType::WorldViewMatrix => {
                write_matrix(self.view * renderable.world_matrix(), dst);
            }
            AutoConstantType::InverseTransposeWorldViewMatrix => {
                write_matrix((self.view * renderable.world_matrix()).inverse().transpose(), dst);
            }
            AutoConstantType::DerivedSceneColour => {
                write_floats(&self.derived_scene_colour(pass).to_array(), dst);
            }
            AutoConstantType::SurfaceShininess => write_floats(&[pass.surface.shininess], dst),
            AutoConstantType::TextureMatrix => {
                write_matrix(self.texture_matrix(binding.data as usize), dst);
            }
            AutoConstantType::SurfaceAlphaRejectionValue => {
                write_floats(&[pass.alpha_reject.normalized_value()], dst);
            }
            AutoConstantType::Custom => {
                let value = renderable
                    .custom_parameter(binding.data)
                    .unwrap_or(Vec4::ZERO);
                write_floats(&value.to_array(), dst);
            }
        }
    }
}

fn write_matrix(matrix: Mat4, dst: &mut [f32]) {
    write_floats(&matrix.to_cols_array(), dst);
}

fn write_floats(src: &[f32], dst: &mut [f32]) {
    let len = src.len().min(dst.len());
    dst[..len].copy_from_slice(&src[..len]);
}
