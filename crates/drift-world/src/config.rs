//! World configuration.
//!
//! Streaming, origin and generation settings, loaded from and saved to TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};

use drift_common::ConfigError;

use crate::generation::GeneratorConfig;
use crate::origin::OriginConfig;
use crate::streaming::StreamingConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "drift.toml";

/// Complete world configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk streaming
    pub streaming: StreamingConfig,
    /// Floating origin
    pub origin: OriginConfig,
    /// Terrain and object generation
    pub generation: GeneratorConfig,
}

impl WorldConfig {
    /// Load configuration from `drift.toml` in the working directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Rejects values the world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.streaming.validate()?;
        self.origin.validate()?;
        self.generation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::ViewShape;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert!((config.streaming.chunk_size - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.streaming.view_distance, 2);
        assert_eq!(config.streaming.view_shape, ViewShape::Diamond);
        assert!((config.origin.threshold - 1000.0).abs() < f32::EPSILON);
        assert_eq!(config.generation.seed, 12345);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WorldConfig::default();
        config.streaming.view_distance = -3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeViewDistance(-3))
        );

        let mut config = WorldConfig::default();
        config.origin.threshold = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveShiftThreshold(0.0))
        );

        let mut config = WorldConfig::default();
        config.generation.spawn_threshold = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpawnThresholdOutOfRange(1.5))
        );

        let mut config = WorldConfig::default();
        config.streaming.tick_interval = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeTickInterval(_))
        ));
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("drift.toml");

        let mut config = WorldConfig::default();
        config.streaming.view_distance = 4;
        config.streaming.view_shape = ViewShape::Square;
        config.origin.clear_trails = false;
        config.generation.seed = -77;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = WorldConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("drift.toml");
        fs::write(
            &config_path,
            "[streaming]\nview_distance = 6\nview_shape = \"square\"\n",
        )
        .expect("write");

        let loaded = WorldConfig::load_from(&config_path);
        assert_eq!(loaded.streaming.view_distance, 6);
        assert_eq!(loaded.streaming.view_shape, ViewShape::Square);
        assert!((loaded.streaming.chunk_size - 50.0).abs() < f64::EPSILON);
        assert_eq!(loaded.origin, OriginConfig::default());
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = WorldConfig::load_from("/nonexistent/path/drift.toml");
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn test_config_load_garbage() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("drift.toml");
        fs::write(&config_path, "streaming = [not toml").expect("write");
        assert_eq!(WorldConfig::load_from(&config_path), WorldConfig::default());
    }

    #[test]
    fn test_config_toml_serialization() {
        let toml_str =
            toml::to_string_pretty(&WorldConfig::default()).expect("Failed to serialize");
        assert!(toml_str.contains("[streaming]"));
        assert!(toml_str.contains("view_distance"));
        assert!(toml_str.contains("[generation.palette]"));
    }
}
