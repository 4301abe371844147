//! kmzpatch configuration.
//!
//! Loaded from `~/.kmzpatch/config.toml` when present; defaults otherwise.
//! CLI flags override file values per invocation.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub action: ActionConfig,
}

/// The per-waypoint action set woven into patched documents.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ActionConfig {
    /// Insert a hover action before each photograph.
    pub hover_enabled: bool,

    /// Hover duration in seconds. Must be in (0, 60].
    pub hover_seconds: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            hover_enabled: true,
            hover_seconds: 2.0,
        }
    }
}

impl ActionConfig {
    /// Check that the hover duration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.hover_enabled && !(self.hover_seconds > 0.0 && self.hover_seconds <= 60.0) {
            return Err(format!(
                "hover seconds must be between 0 (exclusive) and 60, got {}",
                self.hover_seconds
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load config from `~/.kmzpatch/config.toml`.
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        config
            .action
            .validate()
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        Ok(config)
    }

    /// The config file path: `~/.kmzpatch/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".kmzpatch").join("config.toml"))
    }
}
