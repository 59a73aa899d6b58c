//! Engine configuration, read from TOML.
//!
//! ```toml
//! [layout]
//! node_width = 240.0
//! horizontal_step = 320.0
//!
//! [sync]
//! require_single_parent = false
//!
//! [saves]
//! max_slots = 5
//! ```
//!
//! Every section and key is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::layout::LayoutConfig;
use crate::persistence::SaveConfig;
use crate::synchronizer::SyncOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub sync: SyncOptions,
    pub saves: SaveConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file gives the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject geometry that would overlap nodes and an unusable slot count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;

        let values = [
            ("origin_x", layout.origin_x),
            ("origin_y", layout.origin_y),
            ("node_width", layout.node_width),
            ("node_height", layout.node_height),
            ("horizontal_step", layout.horizontal_step),
            ("vertical_step", layout.vertical_step),
            ("text_margin", layout.text_margin),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "layout.{name} must be a finite number, found {value}"
            )));
        }

        if layout.node_width <= 0.0 || layout.node_height <= 0.0 {
            return Err(ConfigError::Invalid(
                "layout node size must be positive".to_string(),
            ));
        }
        if layout.text_margin < 0.0 {
            return Err(ConfigError::Invalid(
                "layout.text_margin must not be negative".to_string(),
            ));
        }
        if layout.horizontal_step <= layout.node_width {
            return Err(ConfigError::Invalid(format!(
                "layout.horizontal_step ({}) must exceed node_width ({})",
                layout.horizontal_step, layout.node_width
            )));
        }
        if layout.vertical_step <= layout.node_height {
            return Err(ConfigError::Invalid(format!(
                "layout.vertical_step ({}) must exceed node_height ({})",
                layout.vertical_step, layout.node_height
            )));
        }
        if self.saves.max_slots == 0 {
            return Err(ConfigError::Invalid(
                "saves.max_slots must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.saves.max_slots, 3);
        assert_eq!(config.layout.node_width, 200.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [layout]
            node_width = 240.0
            horizontal_step = 320.0

            [sync]
            require_single_parent = false

            [saves]
            max_slots = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.node_width, 240.0);
        assert_eq!(config.layout.node_height, 100.0);
        assert!(!config.sync.require_single_parent);
        assert!(config.sync.reject_mixed_children);
        assert_eq!(config.saves.max_slots, 5);
    }

    #[test]
    fn test_overlapping_geometry_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [layout]
            node_width = 400.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = EngineConfig::from_toml_str(
            r#"
            [layout]
            vertical_step = 50.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_geometry_rejected() {
        let result =
            EngineConfig::from_toml_str("[layout]\nvertical_step = nan\nnode_width = nan\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = EngineConfig::from_toml_str("[layout]\nhorizontal_step = inf\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.layout.origin_y = f32::NEG_INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_slots_rejected() {
        let result = EngineConfig::from_toml_str("[saves]\nmax_slots = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_toml() {
        let result = EngineConfig::from_toml_str("[layout\nnode_width = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("engine.toml");

        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());

        std::fs::write(&path, "[saves]\nmax_slots = 2\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().saves.max_slots, 2);
    }
}
