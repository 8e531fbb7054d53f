//! Application settings

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::env::EnvSource;
use crate::error::{Error, Result};

pub const DRY_RUN_VAR: &str = "PATHEDIT_DRY_RUN";
pub const LOG_VAR: &str = "PATHEDIT_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Trace writes instead of persisting them.
    pub dry_run: bool,
    /// `tracing_subscriber::EnvFilter` directives.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pathedit").join("config.toml"))
    }

    /// Loads the user's config file (defaults when absent) and applies
    /// environment overrides.
    pub fn load(env: &dyn EnvSource) -> Result<Self> {
        let mut settings = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(env);
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn apply_env(&mut self, env: &dyn EnvSource) {
        if let Some(flag) = env.var(DRY_RUN_VAR).as_deref().and_then(parse_flag) {
            self.dry_run = flag;
        }
        if let Some(filter) = env.var(LOG_VAR).filter(|f| !f.trim().is_empty()) {
            self.log_filter = filter;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
