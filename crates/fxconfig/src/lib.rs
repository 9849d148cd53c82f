//! Configuration surface for the trail distortion effect.
//!
//! A config file is plain TOML:
//!
//! ```toml
//! version = 1
//! preset = "lens"
//!
//! [parameters]
//! decay_factor = 0.98
//! blur_kernel = { width = 5, shape = "tent" }
//!
//! [display]
//! width = 1280
//! height = 720
//! ```
//!
//! The preset supplies a full [`DistortionParameters`] set, the `[parameters]`
//! table overrides individual fields, and the result is validated before it is
//! handed to the compositor. Nothing is clamped silently.

mod params;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use params::{
    BlurKernel, DistortionParameters, FeedbackSource, KernelShape, ParameterError,
    ParameterOverrides, Preset, KERNEL_WIDTHS, MAX_MOTION_BLUR_SAMPLES,
    MAX_SELECTIVE_BLUR_STRENGTH,
};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported configuration version {0} (expected {CONFIG_VERSION})")]
    Version(u32),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ParameterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FxConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub parameters: ParameterOverrides,
    #[serde(default)]
    pub display: Option<DisplayConfig>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            preset: None,
            parameters: ParameterOverrides::default(),
            display: None,
        }
    }
}

impl FxConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FxConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Version(self.version));
        }
        if let Some(display) = self.display {
            if display.width == 0 || display.height == 0 {
                return Err(ParameterError::DisplaySize {
                    width: display.width,
                    height: display.height,
                }
                .into());
            }
        }
        self.resolve()?;
        Ok(())
    }

    /// Preset parameters with the file's overrides applied.
    pub fn resolve(&self) -> Result<DistortionParameters, ConfigError> {
        self.resolve_with(None, &ParameterOverrides::default())
    }

    /// Like [`FxConfig::resolve`] but lets a caller (usually the CLI) replace the
    /// preset and layer its own overrides on top of the file's.
    pub fn resolve_with(
        &self,
        preset: Option<Preset>,
        overrides: &ParameterOverrides,
    ) -> Result<DistortionParameters, ConfigError> {
        let preset = preset.or(self.preset).unwrap_or_default();
        let merged = self.parameters.merge(overrides);
        let params = merged.apply(preset.parameters());
        params.validate()?;
        Ok(params)
    }

    pub fn display(&self) -> DisplayConfig {
        self.display.unwrap_or_default()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
version = 1
preset = "fluid"

[parameters]
decay_factor = 0.95
motion_blur_samples = 8
blur_kernel = { width = 5, shape = "box" }

[display]
width = 800
height = 600
"#;

    #[test]
    fn parses_preset_and_overrides() {
        let config = FxConfig::from_toml_str(CONFIG).unwrap();
        let params = config.resolve().unwrap();
        assert_eq!(params.decay_factor, 0.95);
        assert_eq!(params.motion_blur_samples, 8);
        assert_eq!(params.blur_kernel.width, 5);
        // untouched fields come from the fluid preset
        assert_eq!(params.splat_gain, 5.0);
        assert_eq!(
            config.display(),
            DisplayConfig {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn empty_file_resolves_to_defaults() {
        let config = FxConfig::from_toml_str("").unwrap();
        assert_eq!(config.resolve().unwrap(), DistortionParameters::default());
        assert_eq!(config.display(), DisplayConfig::default());
    }

    #[test]
    fn rejects_invalid_parameter_values() {
        let err = FxConfig::from_toml_str(
            r#"
[parameters]
trail_radius = -0.5
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ParameterError::NotPositive {
                name: "trail_radius",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = FxConfig::from_toml_str(
            r#"
[parameters]
swirl = 3.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_other_versions() {
        let err = FxConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Version(2)));
    }

    #[test]
    fn rejects_zero_display() {
        let err = FxConfig::from_toml_str(
            r#"
[display]
width = 0
height = 600
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ParameterError::DisplaySize { width: 0, .. })
        ));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let config = FxConfig::from_toml_str(CONFIG).unwrap();
        let cli = ParameterOverrides {
            decay_factor: Some(0.9),
            ..Default::default()
        };
        let params = config.resolve_with(Some(Preset::Lens), &cli).unwrap();
        assert_eq!(params.decay_factor, 0.9);
        assert_eq!(params.motion_blur_samples, 8);
        assert_eq!(params.chromatic_offset_scale, 0.025);
    }

    #[test]
    fn serialised_config_parses_back() {
        let config = FxConfig::from_toml_str(CONFIG).unwrap();
        let text = config.to_toml_string().unwrap();
        let reparsed = FxConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed.resolve().unwrap(), config.resolve().unwrap());
    }
}
