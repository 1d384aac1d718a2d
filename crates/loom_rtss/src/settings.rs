//! Shader Generator Settings
//!
//! Configuration for [`ShaderGenerator`](crate::ShaderGenerator). Settings are
//! plain data and can be loaded from JSON:
//!
//! ```rust,ignore
//! let settings = GeneratorSettings::from_json_str(r#"{
//!     "target_language": "glsles100",
//!     "inline_libraries": true
//! }"#)?;
//! ```
//!
//! Missing fields take their [`Default`] value.

use loom_core::ConfigError;
use loom_material::LightCount;
use loom_shader::TargetLanguage;
use serde::{Deserialize, Serialize};

use crate::ffp::{MAX_LIGHTS, MAX_TEXTURE_STAGES};

/// Scheme used when the caller does not name one.
pub const DEFAULT_SCHEME_NAME: &str = "ShaderGeneratorDefaultScheme";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Shading language of the generated source.
    pub target_language: TargetLanguage,
    /// Embed library text into the generated source instead of emitting
    /// `#include` lines.
    pub inline_libraries: bool,
    /// Log every newly generated program pair at debug level.
    pub dump_generated_source: bool,
    /// Upper bound on fragment samplers a single pass may declare. Fixed
    /// function passes are further limited to [`MAX_TEXTURE_STAGES`] units.
    pub max_texture_samplers: u32,
    /// Light slots generated for lit passes that do not set their own.
    pub light_count: LightCount,
    pub default_scheme: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            target_language: TargetLanguage::Glsl330,
            inline_libraries: false,
            dump_generated_source: false,
            max_texture_samplers: 16,
            light_count: LightCount::default(),
            default_scheme: DEFAULT_SCHEME_NAME.to_string(),
        }
    }
}

impl GeneratorSettings {
    /// Parses settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidSettings(e.to_string()))?;
        if settings.max_texture_samplers == 0 {
            return Err(ConfigError::InvalidSettings(
                "max_texture_samplers must be at least 1".to_string(),
            ));
        }
        if settings.max_texture_samplers > MAX_TEXTURE_STAGES {
            return Err(ConfigError::InvalidSettings(format!(
                "max_texture_samplers must be at most {MAX_TEXTURE_STAGES}"
            )));
        }
        if settings.light_count.total() > MAX_LIGHTS {
            return Err(ConfigError::InvalidSettings(format!(
                "light_count must total at most {MAX_LIGHTS} lights"
            )));
        }
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }
}
