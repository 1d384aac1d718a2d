//! GPU-visible value types.

/// The declared type of a shader parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuConstantType {
    Float1,
    Float2,
    Float3,
    Float4,
    Int1,
    Int2,
    Int3,
    Int4,
    Matrix2x2,
    Matrix3x3,
    Matrix3x4,
    Matrix4x4,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DShadow,
}

impl GpuConstantType {
    /// The float vector type with `components` lanes (clamped to `1..=4`).
    #[must_use]
    pub const fn float_vector(components: u32) -> Self {
        match components {
            0 | 1 => Self::Float1,
            2 => Self::Float2,
            3 => Self::Float3,
            _ => Self::Float4,
        }
    }

    #[must_use]
    pub const fn glsl_name(self) -> &'static str {
        match self {
            Self::Float1 => "float",
            Self::Float2 => "vec2",
            Self::Float3 => "vec3",
            Self::Float4 => "vec4",
            Self::Int1 => "int",
            Self::Int2 => "ivec2",
            Self::Int3 => "ivec3",
            Self::Int4 => "ivec4",
            Self::Matrix2x2 => "mat2",
            Self::Matrix3x3 => "mat3",
            Self::Matrix3x4 => "mat3x4",
            Self::Matrix4x4 => "mat4",
            Self::Sampler1D => "sampler1D",
            Self::Sampler2D => "sampler2D",
            Self::Sampler3D => "sampler3D",
            Self::SamplerCube => "samplerCube",
            Self::Sampler2DShadow => "sampler2DShadow",
        }
    }

    /// Human readable name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float1 => "float1",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Int1 => "int1",
            Self::Int2 => "int2",
            Self::Int3 => "int3",
            Self::Int4 => "int4",
            Self::Matrix2x2 => "matrix2x2",
            Self::Matrix3x3 => "matrix3x3",
            Self::Matrix3x4 => "matrix3x4",
            Self::Matrix4x4 => "matrix4x4",
            Self::Sampler1D => "sampler1D",
            Self::Sampler2D => "sampler2D",
            Self::Sampler3D => "sampler3D",
            Self::SamplerCube => "samplerCube",
            Self::Sampler2DShadow => "sampler2DShadow",
        }
    }

    #[must_use]
    pub const fn is_sampler(self) -> bool {
        matches!(
            self,
            Self::Sampler1D
                | Self::Sampler2D
                | Self::Sampler3D
                | Self::SamplerCube
                | Self::Sampler2DShadow
        )
    }

    /// Number of scalar slots the type occupies in a constant buffer.
    /// Samplers occupy none.
    #[must_use]
    pub const fn component_count(self) -> usize {
        match self {
            Self::Float1 | Self::Int1 => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 | Self::Matrix2x2 => 4,
            Self::Matrix3x3 => 9,
            Self::Matrix3x4 => 12,
            Self::Matrix4x4 => 16,
            Self::Sampler1D
            | Self::Sampler2D
            | Self::Sampler3D
            | Self::SamplerCube
            | Self::Sampler2DShadow => 0,
        }
    }
}
