//! Configuration for the opacity controller
//!
//! Loaded once from `~/.config/glassy/config.toml`. A missing file means
//! defaults; on first run a default file is written next to where it is
//! looked for.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Immutable configuration snapshot
///
/// Percent fields are stored as the user writes them (0-100); use the
/// `*_level` accessors for the normalized 0.0-1.0 form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Fallback preferred opacity, in percent
    pub target_opacity: f64,
    /// Floor for every opacity change, in percent
    pub minimum: f64,
    /// Increment per increase/decrease, in percent
    pub step: f64,
    /// Verbose logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_opacity: 85.0,
            minimum: 25.0,
            step: 5.0,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location
    ///
    /// An explicit path must exist. The default location may be absent, in
    /// which case defaults are returned and a default file is written.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !explicit && !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            if let Err(e) = Self::save_default(&path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the config file in the user config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoHomeDir("config"))?;
        Ok(dir.join("glassy").join("config.toml"))
    }

    fn save_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        // Serializing a plain struct of numbers cannot fail.
        let content = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Default config written to {:?}", path);
        Ok(())
    }

    /// Check ranges and relationships between fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("targetOpacity", self.target_opacity),
            ("minimum", self.minimum),
            ("step", self.step),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::invalid(
                    key,
                    format!("{} is not a percentage between 0 and 100", value),
                ));
            }
        }
        if self.step <= 0.0 {
            return Err(ConfigError::invalid("step", "must be greater than 0"));
        }
        if self.target_opacity < self.minimum {
            return Err(ConfigError::invalid(
                "targetOpacity",
                format!("{} is below minimum {}", self.target_opacity, self.minimum),
            ));
        }
        Ok(())
    }

    /// Minimum opacity (0.0-1.0)
    pub fn min_level(&self) -> f64 {
        self.minimum / 100.0
    }

    /// Step size (0.0-1.0)
    pub fn step_level(&self) -> f64 {
        self.step / 100.0
    }

    /// Fallback preferred opacity (0.0-1.0)
    pub fn target_level(&self) -> f64 {
        self.target_opacity / 100.0
    }
}
