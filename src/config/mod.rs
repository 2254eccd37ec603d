use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::LineNumberMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// User preferences from `~/.config/difi/config.toml`.
///
/// Every key is optional; missing keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub colors: ColorConfig,
}

/// [ui] section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub line_numbers: LineNumberMode,
    /// Show the key hint in the status bar.
    #[serde(default = "default_true")]
    pub show_guide: bool,
}

/// [colors] section. Values are `#rrggbb` or colour names; anything
/// unparseable falls back to the built-in colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_border")]
    pub border: String,
    #[serde(default = "default_focus")]
    pub focus: String,
    #[serde(default = "default_line_number")]
    pub line_number: String,
    #[serde(default = "default_selection_bg")]
    pub diff_selection_bg: String,
}

fn default_true() -> bool {
    true
}

fn default_border() -> String {
    "#D9DCCF".into()
}

fn default_focus() -> String {
    "#6e7781".into()
}

fn default_line_number() -> String {
    "#808080".into()
}

// Empty means the built-in selection colour.
fn default_selection_bg() -> String {
    String::new()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            line_numbers: LineNumberMode::default(),
            show_guide: true,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            border: default_border(),
            focus: default_focus(),
            line_number: default_line_number(),
            diff_selection_bg: default_selection_bg(),
        }
    }
}

impl Config {
    /// Location of the config file, if the platform has a config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("difi").join("config.toml"))
    }

    /// Load the user's config. A missing file gives the defaults; an
    /// unreadable or malformed one is logged and also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("no config at {}", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
