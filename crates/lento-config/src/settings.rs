//! Engine settings file format.

use lento_core::SmootherConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Engine constants as stored on disk.
///
/// Every field is optional and falls back to [`SmootherConfig::default`].
///
/// # TOML Format
///
/// ```toml
/// num_sets = 8
/// half_life_secs = 2.0
/// controller_base = 90
/// epsilon = 1e-5
/// max_points_per_block = 512
/// max_events_per_block = 4096
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Number of independent parameter sets.
    pub num_sets: usize,
    /// Seconds to cross the full range at slowness 0.5.
    pub half_life_secs: f64,
    /// Controller number of parameter set 0.
    pub controller_base: u8,
    /// Values closer than this are treated as equal.
    pub epsilon: f64,
    /// Capacity of each output point queue.
    pub max_points_per_block: usize,
    /// Capacity of the step event buffer.
    pub max_events_per_block: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        SmootherConfig::default().into()
    }
}

impl From<SmootherConfig> for EngineSettings {
    fn from(config: SmootherConfig) -> Self {
        Self {
            num_sets: config.num_sets,
            half_life_secs: config.half_life_secs,
            controller_base: config.controller_base,
            epsilon: config.epsilon,
            max_points_per_block: config.max_points_per_block,
            max_events_per_block: config.max_events_per_block,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Engine configuration for these settings. Not validated.
    pub fn to_smoother_config(&self) -> SmootherConfig {
        SmootherConfig {
            num_sets: self.num_sets,
            half_life_secs: self.half_life_secs,
            controller_base: self.controller_base,
            epsilon: self.epsilon,
            max_points_per_block: self.max_points_per_block,
            max_events_per_block: self.max_events_per_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = EngineSettings::from_toml("").unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.to_smoother_config(), SmootherConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let settings = EngineSettings::from_toml("num_sets = 4\nhalf_life_secs = 0.5\n").unwrap();
        assert_eq!(settings.num_sets, 4);
        assert_eq!(settings.half_life_secs, 0.5);
        assert_eq!(settings.controller_base, 90);
    }

    #[test]
    fn integer_half_life_is_accepted() {
        let settings = EngineSettings::from_toml("half_life_secs = 3").unwrap();
        assert_eq!(settings.half_life_secs, 3.0);
    }

    #[test]
    fn toml_round_trip() {
        let settings = EngineSettings {
            num_sets: 12,
            epsilon: 1e-6,
            ..EngineSettings::default()
        };
        let text = settings.to_toml().unwrap();
        assert_eq!(EngineSettings::from_toml(&text).unwrap(), settings);
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let err = EngineSettings::from_toml("num_sets = \"eight\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
