//! Process configuration.
//!
//! Loaded from environment variables. Every key is optional; blank values
//! count as unset.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// SQLite database file. Unset means an in-memory database.
pub const ENV_DB_PATH: &str = "ROLLCALL_DB_PATH";
/// Log level: trace|debug|info|warn|error.
pub const ENV_LOG_LEVEL: &str = "ROLLCALL_LOG_LEVEL";
/// Absolute directory for rolling log files. Unset means stderr.
pub const ENV_LOG_DIR: &str = "ROLLCALL_LOG_DIR";
/// Whether new meetings are announced to the team roster.
pub const ENV_NOTIFICATIONS: &str = "ROLLCALL_NOTIFICATIONS";

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    pub log_dir: Option<PathBuf>,
    pub notifications_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
            notifications_enabled: true,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, message } => write!(f, "invalid {key}: {message}"),
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Loads configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = lookup(vars, ENV_DB_PATH).map(PathBuf::from);

        let log_level = match lookup(vars, ENV_LOG_LEVEL) {
            Some(value) => normalize_level(value).map_err(|message| ConfigError::Invalid {
                key: ENV_LOG_LEVEL,
                message,
            })?,
            None => defaults.log_level,
        };

        let log_dir = lookup(vars, ENV_LOG_DIR)
            .map(|value| {
                normalize_log_dir(Path::new(value)).map_err(|message| ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    message,
                })
            })
            .transpose()?;

        let notifications_enabled = match lookup(vars, ENV_NOTIFICATIONS) {
            Some(value) => parse_switch(value).ok_or_else(|| ConfigError::Invalid {
                key: ENV_NOTIFICATIONS,
                message: format!("expected on|off|true|false|1|0, got `{value}`"),
            })?,
            None => defaults.notifications_enabled,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            notifications_enabled,
        })
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
