//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$EVENTFORGE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/eventforge/config.toml`
//! 3. `~/.eventforge/config.toml`
//!
//! # Project Config
//!
//! Located at `<project>/.eventforge/config.toml`.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::paths::TOOL_DIR;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// probe_media = true
/// keep_journals = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Read sample rate, channel count and length from copied media
    pub probe_media: Option<bool>,

    /// Keep journals of successful operations instead of deleting them
    pub keep_journals: Option<bool>,
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// assets_dir = "Assets"
/// probe_media = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Media directory relative to the project root
    pub assets_dir: Option<String>,

    pub probe_media: Option<bool>,

    pub keep_journals: Option<bool>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `assets_dir` is empty, absolute,
    /// escapes the project root, or points into tool state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.assets_dir {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "assets_dir cannot be empty".to_string(),
                ));
            }
            if dir.starts_with('/') || dir.contains('\\') {
                return Err(ConfigError::InvalidValue(format!(
                    "assets_dir must be a relative '/'-separated path: {dir}"
                )));
            }
            for component in dir.split('/') {
                if component.is_empty() || component == "." || component == ".." {
                    return Err(ConfigError::InvalidValue(format!(
                        "assets_dir has an invalid component: {dir}"
                    )));
                }
            }
            let first = dir.split('/').next().unwrap_or_default();
            if first == "Metadata" || first == TOOL_DIR {
                return Err(ConfigError::InvalidValue(format!(
                    "assets_dir cannot live under {first}/"
                )));
            }
        }
        Ok(())
    }
}
