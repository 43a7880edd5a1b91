//! Viewer configuration.
//!
//! Values come from (lowest to highest precedence) the built-in defaults, an
//! optional YAML file, and command-line overrides applied by the binaries.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "DamagedHelmet.gltf";
pub const DEFAULT_ENVIRONMENT: &str =
    "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/pond_bridge_night_1k.hdr";

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// glTF/GLB model, path or http(s) URL.
    pub model: String,
    /// Radiance HDR environment, path or http(s) URL.
    pub environment: String,
    /// Directory for downloaded assets. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub max_pixel_ratio: f64,
    pub rgb_shift_amount: f32,
    pub rgb_shift_angle: f32,
    pub exposure: f32,
    /// Draw the environment behind the model instead of the clear colour.
    pub show_background: bool,
    /// Seconds for the model to settle on a new pointer target.
    pub tween_duration: f32,
    /// Full rotation range (radians) swept as the cursor crosses the window.
    pub rotation_range: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            environment: DEFAULT_ENVIRONMENT.into(),
            cache_dir: None,
            window_width: 1280,
            window_height: 720,
            max_pixel_ratio: 2.0,
            rgb_shift_amount: 0.0035,
            rgb_shift_angle: 0.0,
            exposure: 0.6,
            show_background: false,
            tween_duration: 0.5,
            rotation_range: std::f32::consts::PI * 0.3,
        }
    }
}

impl ViewerConfig {
    /// Load a YAML config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model",
                reason: "must not be empty".into(),
            });
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "environment",
                reason: "must not be empty".into(),
            });
        }
        if self.max_pixel_ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "max_pixel_ratio",
                reason: format!("{} is not positive", self.max_pixel_ratio),
            });
        }
        if self.tween_duration.is_nan() || self.tween_duration < 0.0 {
            return Err(ConfigError::Invalid {
                field: "tween_duration",
                reason: format!("{} is negative", self.tween_duration),
            });
        }
        if self.exposure.is_nan() || self.exposure <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "exposure",
                reason: format!("{} is not positive", self.exposure),
            });
        }
        Ok(())
    }
}
