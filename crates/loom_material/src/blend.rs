//! Texture layer blending and comparison functions.
//!
//! Mirrors the classic fixed-function "extended" blend model: each texture
//! layer combines two sources with one of fifteen operations, independently
//! for the colour and the alpha channel.

use std::str::FromStr;

use glam::Vec4;
use loom_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Which channel set a [`LayerBlendModeEx`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerBlendType {
    Colour,
    Alpha,
}

/// Blend operation between `source1` and `source2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerBlendOperationEx {
    /// Use source1 without modification.
    Source1,
    /// Use source2 without modification.
    Source2,
    /// `source1 * source2`.
    Modulate,
    /// `source1 * source2 * 2`.
    ModulateX2,
    /// `source1 * source2 * 4`.
    ModulateX4,
    /// `source1 + source2`.
    Add,
    /// `source1 + source2 - 0.5`.
    AddSigned,
    /// `source1 + source2 - source1 * source2`.
    AddSmooth,
    /// `source1 - source2`.
    Subtract,
    /// Lerp weighted by the interpolated vertex alpha.
    BlendDiffuseAlpha,
    /// Lerp weighted by the texture alpha.
    BlendTextureAlpha,
    /// Lerp weighted by the alpha of the previous stage.
    BlendCurrentAlpha,
    /// Lerp weighted by the manual `factor`.
    BlendManual,
    /// Dot product of the two sources.
    DotProduct,
    /// Lerp weighted by the interpolated vertex colour.
    BlendDiffuseColour,
}

impl LayerBlendOperationEx {
    pub const ALL: [Self; 15] = [
        Self::Source1,
        Self::Source2,
        Self::Modulate,
        Self::ModulateX2,
        Self::ModulateX4,
        Self::Add,
        Self::AddSigned,
        Self::AddSmooth,
        Self::Subtract,
        Self::BlendDiffuseAlpha,
        Self::BlendTextureAlpha,
        Self::BlendCurrentAlpha,
        Self::BlendManual,
        Self::DotProduct,
        Self::BlendDiffuseColour,
    ];

    /// The material script token for this operation.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Source1 => "source1",
            Self::Source2 => "source2",
            Self::Modulate => "modulate",
            Self::ModulateX2 => "modulate_x2",
            Self::ModulateX4 => "modulate_x4",
            Self::Add => "add",
            Self::AddSigned => "add_signed",
            Self::AddSmooth => "add_smooth",
            Self::Subtract => "subtract",
            Self::BlendDiffuseAlpha => "blend_diffuse_alpha",
            Self::BlendTextureAlpha => "blend_texture_alpha",
            Self::BlendCurrentAlpha => "blend_current_alpha",
            Self::BlendManual => "blend_manual",
            Self::DotProduct => "dotproduct",
            Self::BlendDiffuseColour => "blend_diffuse_colour",
        }
    }

    /// Whether the operation reads `source1`.
    #[must_use]
    pub const fn reads_source1(self) -> bool {
        !matches!(self, Self::Source2)
    }

    /// Whether the operation reads `source2`.
    #[must_use]
    pub const fn reads_source2(self) -> bool {
        !matches!(self, Self::Source1)
    }
}

impl FromStr for LayerBlendOperationEx {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.token() == s)
            .ok_or_else(|| ConfigError::InvalidToken {
                kind: "blend operation",
                token: s.to_string(),
            })
    }
}

/// Where a blend operand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerBlendSource {
    /// The colour accumulated by previous layers (vertex colour for the first layer).
    Current,
    /// The colour sampled from this layer's texture.
    Texture,
    /// The interpolated diffuse vertex colour.
    Diffuse,
    /// The interpolated specular vertex colour.
    Specular,
    /// A constant stored in the blend mode.
    Manual,
}

impl LayerBlendSource {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Current => "src_current",
            Self::Texture => "src_texture",
            Self::Diffuse => "src_diffuse",
            Self::Specular => "src_specular",
            Self::Manual => "src_manual",
        }
    }
}

impl FromStr for LayerBlendSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Current,
            Self::Texture,
            Self::Diffuse,
            Self::Specular,
            Self::Manual,
        ]
        .into_iter()
        .find(|src| src.token() == s)
        .ok_or_else(|| ConfigError::InvalidToken {
            kind: "blend source",
            token: s.to_string(),
        })
    }
}

/// Full description of one channel's layer blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerBlendModeEx {
    pub blend_type: LayerBlendType,
    pub operation: LayerBlendOperationEx,
    pub source1: LayerBlendSource,
    pub source2: LayerBlendSource,
    /// Manual colour for `source1` (colour blends).
    pub colour_arg1: Vec4,
    /// Manual colour for `source2` (colour blends).
    pub colour_arg2: Vec4,
    /// Manual alpha for `source1` (alpha blends).
    pub alpha_arg1: f32,
    /// Manual alpha for `source2` (alpha blends).
    pub alpha_arg2: f32,
    /// Lerp factor for [`LayerBlendOperationEx::BlendManual`].
    pub factor: f32,
}

impl LayerBlendModeEx {
    /// `modulate src_texture src_current`, the default of every texture layer.
    #[must_use]
    pub const fn new(blend_type: LayerBlendType) -> Self {
        Self {
            blend_type,
            operation: LayerBlendOperationEx::Modulate,
            source1: LayerBlendSource::Texture,
            source2: LayerBlendSource::Current,
            colour_arg1: Vec4::ONE,
            colour_arg2: Vec4::ONE,
            alpha_arg1: 1.0,
            alpha_arg2: 1.0,
            factor: 0.0,
        }
    }

    #[must_use]
    pub const fn with_operation(
        mut self,
        operation: LayerBlendOperationEx,
        source1: LayerBlendSource,
        source2: LayerBlendSource,
    ) -> Self {
        self.operation = operation;
        self.source1 = source1;
        self.source2 = source2;
        self
    }

    /// Parses a `colour_op_ex` / `alpha_op_ex` line.
    ///
    /// Format: `<op> <source1> <source2> [factor] [manual1...] [manual2...]`.
    /// `factor` is present only for `blend_manual`. Manual colour arguments
    /// take three components (alpha defaults to 1) for colour blends and one
    /// component for alpha blends.
    pub fn parse(blend_type: LayerBlendType, line: &str) -> Result<Self, ConfigError> {
        let mut tokens = line.split_whitespace();
        let mut next = |kind: &'static str| {
            tokens.next().ok_or_else(|| ConfigError::InvalidToken {
                kind,
                token: line.to_string(),
            })
        };

        let operation: LayerBlendOperationEx = next("blend operation")?.parse()?;
        let source1: LayerBlendSource = next("blend source")?.parse()?;
        let source2: LayerBlendSource = next("blend source")?.parse()?;

        let mut mode = Self::new(blend_type).with_operation(operation, source1, source2);

        let mut number = |kind: &'static str| -> Result<f32, ConfigError> {
            let token = next(kind)?;
            token
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ConfigError::InvalidToken {
                    kind,
                    token: token.to_string(),
                })
        };

        if operation == LayerBlendOperationEx::BlendManual {
            mode.factor = number("manual blend factor")?;
        }

        for (source, slot) in [(source1, 0usize), (source2, 1usize)] {
            if source != LayerBlendSource::Manual {
                continue;
            }
            match blend_type {
                LayerBlendType::Colour => {
                    let colour = Vec4::new(
                        number("manual colour")?,
                        number("manual colour")?,
                        number("manual colour")?,
                        1.0,
                    );
                    if slot == 0 {
                        mode.colour_arg1 = colour;
                    } else {
                        mode.colour_arg2 = colour;
                    }
                }
                LayerBlendType::Alpha => {
                    let alpha = number("manual alpha")?;
                    if slot == 0 {
                        mode.alpha_arg1 = alpha;
                    } else {
                        mode.alpha_arg2 = alpha;
                    }
                }
            }
        }

        Ok(mode)
    }

    /// True when the two modes would generate different blend code.
    ///
    /// Only the operation and the sources matter; manual constants are
    /// compared separately by the hash.
    #[must_use]
    pub fn differs_in_structure(&self, other: &Self) -> bool {
        self.operation != other.operation
            || self.source1 != other.source1
            || self.source2 != other.source2
    }
}

/// Comparison used by alpha rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareFunction {
    AlwaysFail,
    #[default]
    AlwaysPass,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

impl CompareFunction {
    pub const ALL: [Self; 8] = [
        Self::AlwaysFail,
        Self::AlwaysPass,
        Self::Less,
        Self::LessEqual,
        Self::Equal,
        Self::NotEqual,
        Self::GreaterEqual,
        Self::Greater,
    ];

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::AlwaysFail => "always_fail",
            Self::AlwaysPass => "always_pass",
            Self::Less => "less",
            Self::LessEqual => "less_equal",
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::GreaterEqual => "greater_equal",
            Self::Greater => "greater",
        }
    }

    /// Numeric code pushed to the generated alpha-test function.
    #[must_use]
    pub const fn shader_code(self) -> f32 {
        match self {
            Self::AlwaysFail => 0.0,
            Self::AlwaysPass => 1.0,
            Self::Less => 2.0,
            Self::LessEqual => 3.0,
            Self::Equal => 4.0,
            Self::NotEqual => 5.0,
            Self::GreaterEqual => 6.0,
            Self::Greater => 7.0,
        }
    }
}

impl FromStr for CompareFunction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.token() == s)
            .ok_or_else(|| ConfigError::InvalidToken {
                kind: "compare function",
                token: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_tokens_round_trip() {
        for op in LayerBlendOperationEx::ALL {
            assert_eq!(op.token().parse::<LayerBlendOperationEx>().unwrap(), op);
        }
    }

    #[test]
    fn test_invalid_operation_token() {
        let err = "multiply".parse::<LayerBlendOperationEx>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidToken {
                kind: "blend operation",
                token: "multiply".to_string()
            }
        );
    }

    #[test]
    fn test_parse_manual_colour_line() {
        let mode = LayerBlendModeEx::parse(
            LayerBlendType::Colour,
            "blend_manual src_manual src_current 0.25 1 0 0",
        )
        .unwrap();
        assert_eq!(mode.operation, LayerBlendOperationEx::BlendManual);
        assert_eq!(mode.source1, LayerBlendSource::Manual);
        assert!((mode.factor - 0.25).abs() < f32::EPSILON);
        assert_eq!(mode.colour_arg1, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_parse_manual_alpha_line() {
        let mode =
            LayerBlendModeEx::parse(LayerBlendType::Alpha, "modulate src_texture src_manual 0.5")
                .unwrap();
        assert!((mode.alpha_arg2 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_rejects_non_finite_manual_values() {
        for line in [
            "blend_manual src_manual src_current nan 1 0 0",
            "blend_manual src_manual src_current 0.5 inf 0 0",
            "source1 src_manual src_current -infinity 0 0",
        ] {
            let err = LayerBlendModeEx::parse(LayerBlendType::Colour, line).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidToken { .. }), "{line}");
        }
        assert!(
            LayerBlendModeEx::parse(LayerBlendType::Alpha, "modulate src_texture src_manual NaN")
                .is_err()
        );
    }

    #[test]
    fn test_parse_rejects_missing_operand() {
        assert!(LayerBlendModeEx::parse(LayerBlendType::Colour, "modulate src_texture").is_err());
        assert!(
            LayerBlendModeEx::parse(LayerBlendType::Colour, "modulate src_texture src_nothing")
                .is_err()
        );
    }

    #[test]
    fn test_compare_function_tokens() {
        assert_eq!(
            "always_pass".parse::<CompareFunction>().unwrap(),
            CompareFunction::AlwaysPass
        );
        assert!("sometimes".parse::<CompareFunction>().is_err());
    }
}
