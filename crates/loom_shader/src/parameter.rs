//! Shader parameters and the auto-constant table.

use slotmap::new_key_type;

use crate::types::GpuConstantType;

new_key_type! {
    /// Stable handle to a [`Parameter`] inside its owning
    /// [`Program`](crate::Program). Only valid for that program.
    pub struct ParamId;
}

/// Vertex-stream / interpolator binding of an input or output parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Unknown,
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Color,
    TextureCoordinates,
    Binormal,
    Tangent,
}

impl Semantic {
    /// Fragment used when generating parameter names.
    #[must_use]
    pub const fn name_fragment(self) -> &'static str {
        match self {
            Self::Unknown => "Param",
            Self::Position => "Pos",
            Self::BlendWeights => "BlendWeights",
            Self::BlendIndices => "BlendIndices",
            Self::Normal => "Normal",
            Self::Color => "Color",
            Self::TextureCoordinates => "Texcoord",
            Self::Binormal => "BiNormal",
            Self::Tangent => "Tangent",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Position => "position",
            Self::BlendWeights => "blend_weights",
            Self::BlendIndices => "blend_indices",
            Self::Normal => "normal",
            Self::Color => "color",
            Self::TextureCoordinates => "texcoord",
            Self::Binormal => "binormal",
            Self::Tangent => "tangent",
        }
    }
}

/// What a parameter's value means, independent of how it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Content {
    Unknown,
    PositionObjectSpace,
    PositionWorldSpace,
    PositionProjectiveSpace,
    NormalObjectSpace,
    ColorDiffuse,
    ColorSpecular,
    /// Texture coordinate feeding texture unit `n`.
    TextureCoordinate(u32),
    /// Engine- or plugin-specific content.
    Custom(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterUsage {
    Input,
    Output,
    Uniform,
    Local,
}

impl ParameterUsage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Uniform => "uniform",
            Self::Local => "local",
        }
    }
}

/// Values the engine computes and pushes without material involvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstantType {
    WorldMatrix,
    InverseTransposeWorldMatrix,
    ViewMatrix,
    InverseTransposeViewMatrix,
    ViewProjMatrix,
    WorldViewProjMatrix,
    WorldViewMatrix,
    InverseTransposeWorldViewMatrix,
    /// Scene ambient times surface ambient plus surface emissive, with the
    /// surface diffuse alpha.
    DerivedSceneColour,
    SurfaceShininess,
    /// Texture transform of the texture unit given by the binding data.
    TextureMatrix,
    /// Alpha reference of the current pass, normalised to `[0, 1]`.
    SurfaceAlphaRejectionValue,
    /// `Renderable::custom_parameter(data)`.
    Custom,
}

impl AutoConstantType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WorldMatrix => "world_matrix",
            Self::InverseTransposeWorldMatrix => "inverse_transpose_world_matrix",
            Self::ViewMatrix => "view_matrix",
            Self::InverseTransposeViewMatrix => "inverse_transpose_view_matrix",
            Self::ViewProjMatrix => "viewproj_matrix",
            Self::WorldViewProjMatrix => "worldviewproj_matrix",
            Self::WorldViewMatrix => "worldview_matrix",
            Self::InverseTransposeWorldViewMatrix => "inverse_transpose_worldview_matrix",
            Self::DerivedSceneColour => "derived_scene_colour",
            Self::SurfaceShininess => "surface_shininess",
            Self::TextureMatrix => "texture_matrix",
            Self::SurfaceAlphaRejectionValue => "surface_alpha_rejection_value",
            Self::Custom => "custom",
        }
    }

    #[must_use]
    pub const fn constant_type(self) -> GpuConstantType {
        match self {
            Self::SurfaceAlphaRejectionValue | Self::SurfaceShininess => GpuConstantType::Float1,
            Self::Custom | Self::DerivedSceneColour => GpuConstantType::Float4,
            _ => GpuConstantType::Matrix4x4,
        }
    }
}

/// An auto constant together with its extra data (texture unit, custom index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AutoBinding {
    pub kind: AutoConstantType,
    pub data: u32,
}

impl AutoBinding {
    #[must_use]
    pub const fn new(kind: AutoConstantType, data: u32) -> Self {
        Self { kind, data }
    }

    /// `world_matrix`, `texture_matrix1`, `custom1001`, ...
    #[must_use]
    pub fn parameter_name(&self) -> String {
        if self.data == 0 {
            self.kind.name().to_string()
        } else {
            format!("{}{}", self.kind.name(), self.data)
        }
    }
}

/// A typed value visible to one shader program.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) ty: GpuConstantType,
    pub(crate) semantic: Semantic,
    pub(crate) index: u32,
    pub(crate) content: Content,
    pub(crate) usage: ParameterUsage,
    pub(crate) auto: Option<AutoBinding>,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> GpuConstantType {
        self.ty
    }

    #[inline]
    #[must_use]
    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> Content {
        self.content
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> ParameterUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn auto_binding(&self) -> Option<AutoBinding> {
        self.auto
    }

    #[inline]
    #[must_use]
    pub fn is_sampler(&self) -> bool {
        self.ty.is_sampler()
    }
}
