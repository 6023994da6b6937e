//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Per-project overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$EVENTFORGE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/eventforge/config.toml`
//! 3. `~/.eventforge/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use eventforge::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! println!("assets: {}", config.assets_dir());
//! println!("probe media: {}", config.probe_media());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ProjectConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::paths::{ProjectPaths, DEFAULT_ASSETS_DIR, TOOL_DIR};

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: project config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub project: Option<ProjectConfig>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_root` is provided, also loads the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let global_path = Self::find_global();
        let global = match &global_path {
            Some(path) => read_config::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let (project, project_path) = match project_root {
            Some(root) => {
                let path = Self::project_config_path(root);
                if path.exists() {
                    let config = read_config::<ProjectConfig>(&path)?;
                    config.validate()?;
                    (Some(config), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        if let Some(path) = &global_path {
            log::debug!("global config: {}", path.display());
        }
        if let Some(path) = &project_path {
            log::debug!("project config: {}", path.display());
        }

        Ok(Self {
            global,
            project,
            global_path,
            project_path,
        })
    }

    /// Build a config from already-parsed parts.
    pub fn from_parts(global: GlobalConfig, project: Option<ProjectConfig>) -> Self {
        Self {
            global,
            project,
            global_path: None,
            project_path: None,
        }
    }

    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("EVENTFORGE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("eventforge/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(TOOL_DIR).join("config.toml"))
            .filter(|path| path.exists())
    }

    /// `<project>/.eventforge/config.toml`.
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        ProjectPaths::new(project_root.to_path_buf()).config_path()
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Media directory name relative to the project root.
    ///
    /// Defaults to `Assets`. Project scope only.
    pub fn assets_dir(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.assets_dir.as_deref())
            .unwrap_or(DEFAULT_ASSETS_DIR)
    }

    /// Whether copied media is probed for format and length.
    ///
    /// Defaults to `true`.
    pub fn probe_media(&self) -> bool {
        self.project
            .as_ref()
            .and_then(|p| p.probe_media)
            .or(self.global.probe_media)
            .unwrap_or(true)
    }

    /// Whether journals of successful operations are kept.
    ///
    /// Defaults to `false`.
    pub fn keep_journals(&self) -> bool {
        self.project
            .as_ref()
            .and_then(|p| p.keep_journals)
            .or(self.global.keep_journals)
            .unwrap_or(false)
    }

    /// Paths for `root` with the configured media directory.
    pub fn project_paths(&self, root: PathBuf) -> ProjectPaths {
        ProjectPaths::new(root).with_assets_dir(self.assets_dir())
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
