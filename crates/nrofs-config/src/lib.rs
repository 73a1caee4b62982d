//! # nrofs-config
//!
//! Configuration management for nrofs.
//!
//! Loads configuration from:
//! 1. `~/.nrofs/config.toml` (global)
//! 2. `.nrofs/config.toml` under the base directory (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod path;
pub mod testing;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use nrofs_pack::DEFAULT_BLOCK_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations, relative to the current directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load config with the project layer taken from `base`
    pub fn load_from(base: &Path) -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let mut config = Self::load_layers(global.as_deref(), base)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the global and project files without consulting the environment.
    pub fn load_layers(global: Option<&Path>, base: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Global config
        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        // 2. Project config - overrides global
        let project_path = Self::project_config_path(base);
        if project_path.exists() {
            debug!("Loading project config from {:?}", project_path);
            let contents = std::fs::read_to_string(&project_path)?;
            let project_layer: ConfigLayer = toml::from_str(&contents)?;
            config.merge(project_layer);
        }

        Ok(config)
    }

    /// Global config path: ~/.nrofs/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".nrofs/config.toml"))
    }

    /// Project config path: <base>/.nrofs/config.toml
    pub fn project_config_path(base: &Path) -> PathBuf {
        base.join(".nrofs/config.toml")
    }

    /// Merge a project layer; every key the layer sets wins.
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(block_size) = layer.archive.block_size {
            self.archive.block_size = block_size;
        }
        if let Some(level) = layer.logging.level {
            self.logging.level = level;
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(block_size) = var("NROFS_BLOCK_SIZE") {
            if let Ok(n) = block_size.trim().parse() {
                self.archive.block_size = n;
            }
        }
        if let Some(level) = var("NROFS_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// A config file as written, before defaults are filled in
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    archive: ArchiveLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveLayer {
    block_size: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingLayer {
    level: Option<String>,
}

/// Archive creation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Block size as a power of two
    pub block_size: u8,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.archive.block_size, 12);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[archive]"));
        assert!(toml_str.contains("block_size = 12"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_merge_only_set_keys() {
        let mut config = Config::default();
        config.archive.block_size = 16;
        config.logging.level = "debug".to_string();

        let layer: ConfigLayer = toml::from_str("[archive]\nblock_size = 12\n").unwrap();
        config.merge(layer);
        assert_eq!(config.archive.block_size, 12);
        assert_eq!(config.logging.level, "debug");

        config.merge(ConfigLayer::default());
        assert_eq!(config.archive.block_size, 12);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "NROFS_BLOCK_SIZE" => Some("16".to_string()),
            "NROFS_LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.archive.block_size, 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| (key == "NROFS_BLOCK_SIZE").then(|| "huge".to_string()));
        assert_eq!(config.archive.block_size, DEFAULT_BLOCK_SIZE);
    }
}
