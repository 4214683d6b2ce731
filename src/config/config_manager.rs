// src/config/config_manager.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::terrain::noise::NoiseParameters;
use crate::terrain::terrain_config::TerrainConfig;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to access configuration file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize TOML configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("failed to (de)serialize JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatingOriginConfig {
    /// Horizontal distance from the scene origin that triggers a rebase.
    pub threshold: f32,
}

impl Default for FloatingOriginConfig {
    fn default() -> Self {
        FloatingOriginConfig { threshold: 4000.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThreadingConfig {
    // 0 picks one less than the number of logical cores
    pub max_threads: usize,
}

impl ThreadingConfig {
    pub fn resolved_threads(&self) -> usize {
        if self.max_threads == 0 {
            std::cmp::max(1, num_cpus::get().saturating_sub(1))
        } else {
            self.max_threads
        }
    }
}

// Everything the streaming world needs at startup. Missing sections fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StreamingConfiguration {
    pub terrain: TerrainConfig,
    pub noise: NoiseParameters,
    pub floating_origin: FloatingOriginConfig,
    pub threading: ThreadingConfig,
}

impl StreamingConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.terrain.validate()?;
        self.noise.validate()?;
        let threshold = self.floating_origin.threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigurationError::Invalid(format!(
                "floating_origin.threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(ConfigFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ConfigFormat::Json),
            other => Err(ConfigurationError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

// Loads, validates and saves the streaming configuration.
pub struct ConfigurationManager {
    current_config: StreamingConfiguration,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub fn with_config(config: StreamingConfiguration, config_path: Option<PathBuf>) -> Self {
        Self {
            current_config: config,
            config_path,
        }
    }

    // Load configuration from a .toml or .json file and validate it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path_ref = path.as_ref();
        info!("Loading config from: {:?}", path_ref);
        let format = ConfigFormat::from_path(path_ref)?;
        let config_str = fs::read_to_string(path_ref)?;

        let config: StreamingConfiguration = match format {
            ConfigFormat::Toml => toml::from_str(&config_str)?,
            ConfigFormat::Json => serde_json::from_str(&config_str)?,
        };
        config.validate()?;

        Ok(Self {
            current_config: config,
            config_path: Some(path_ref.to_path_buf()),
        })
    }

    // Save configuration to the path it was loaded from (or set later)
    pub fn save_to_file(&self) -> Result<(), ConfigurationError> {
        match &self.config_path {
            Some(path) => self.save_to(path),
            None => {
                warn!("Cannot save configuration: No config path set.");
                Err(ConfigurationError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "config path not set",
                )))
            }
        }
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigurationError> {
        let path_ref = path.as_ref();
        info!("Saving config to: {:?}", path_ref);
        let contents = match ConfigFormat::from_path(path_ref)? {
            ConfigFormat::Toml => toml::to_string_pretty(&self.current_config)?,
            ConfigFormat::Json => serde_json::to_string_pretty(&self.current_config)?,
        };
        fs::write(path_ref, contents)?;
        Ok(())
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    // Replaces the whole configuration; rejected updates leave the current one untouched
    pub fn update_config(&mut self, updates: StreamingConfiguration) -> Result<(), ConfigurationError> {
        updates.validate()?;
        self.current_config = updates;
        Ok(())
    }

    pub fn get_config(&self) -> &StreamingConfiguration {
        &self.current_config
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.current_config.validate()
    }

    pub fn into_config(self) -> StreamingConfiguration {
        self.current_config
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self {
            current_config: StreamingConfiguration::default(),
            config_path: None,
        }
    }
}
