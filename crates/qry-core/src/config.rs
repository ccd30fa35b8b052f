//! Configuration types and loading for qry tools.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::db::ConnectOptions;
use crate::discovery::Discovery;
use crate::error::Result;
use crate::paths;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the tool this process acts as.
    pub tool: String,

    /// Explicit database path. Bypasses discovery when set.
    pub database: Option<PathBuf>,

    /// Private store used when the shared one is unavailable or `force_local` is set.
    pub fallback_database: Option<PathBuf>,

    /// Location of the shared ecosystem store.
    pub shared_database: PathBuf,

    /// Never use the shared store.
    pub force_local: bool,

    /// How long a statement waits for another writer, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: "wherewasi".to_string(),
            database: None,
            fallback_database: None,
            shared_database: paths::shared_database_path(),
            force_local: false,
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration from the default config file, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_at(&Self::default_config_path())
    }

    /// Like [`Config::load`], reading `path` instead. A missing file yields
    /// the defaults.
    pub fn load_at(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from_path(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.expand_paths();
        Ok(config)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> PathBuf {
        paths::config_dir().join("config.toml")
    }

    /// Save configuration to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Expand a path, replacing ~ with home directory.
    pub fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::full(path)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| path.to_string());
        PathBuf::from(expanded)
    }

    fn expand_paths(&mut self) {
        let expand = |p: &Path| Self::expand_path(&p.to_string_lossy());
        self.database = self.database.as_deref().map(expand);
        self.fallback_database = self.fallback_database.as_deref().map(expand);
        self.shared_database = expand(&self.shared_database);
    }

    /// Apply `QRY_TOOL`, `QRY_DATABASE` and `QRY_FORCE_LOCAL`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let prefix = crate::env_prefix();
        if let Ok(tool) = std::env::var(format!("{prefix}_TOOL")) {
            self.tool = tool;
        }
        if let Ok(database) = std::env::var(format!("{prefix}_DATABASE")) {
            self.database = Some(Self::expand_path(&database));
        }
        if let Ok(raw) = std::env::var(format!("{prefix}_FORCE_LOCAL")) {
            self.force_local = parse_bool(&raw).ok_or_else(|| {
                Error::Config(format!("{prefix}_FORCE_LOCAL must be a boolean, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    /// Private store for the configured tool.
    pub fn fallback_database_path(&self) -> PathBuf {
        self.fallback_database
            .clone()
            .unwrap_or_else(|| paths::private_database_path(&self.tool))
    }

    /// Options for [`crate::Database::connect`].
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.tool.clone());
        options.database.clone_from(&self.database);
        options.fallback_database = self.fallback_database_path();
        options.force_local = self.force_local;
        options.discovery = Discovery::with_shared_path(&self.shared_database);
        options.busy_timeout = Duration::from_millis(self.busy_timeout_ms);
        options
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
