//! Runtime configuration for core embedders.
//!
//! # Responsibility
//! - Resolve database path and logging settings from the environment.
//!
//! # Invariants
//! - `log_dir`, when set, is absolute (the logger refuses relative paths).
//! - `log_level` is one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "WODB_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "WODB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WODB_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "wodb.sqlite3";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    InvalidLogLevel(String),
    RelativeLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(key) => write!(f, "{key} must not be empty when set"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(value) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads `WODB_DB_PATH`, `WODB_LOG_LEVEL` and `WODB_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = match lookup(ENV_DB_PATH) {
            Some(value) => PathBuf::from(non_empty(ENV_DB_PATH, value)?),
            None => PathBuf::from(DEFAULT_DB_FILE_NAME),
        };

        let log_level = match lookup(ENV_LOG_LEVEL) {
            Some(value) => normalize_level(&non_empty(ENV_LOG_LEVEL, value)?)
                .map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let log_dir = match lookup(ENV_LOG_DIR) {
            Some(value) => {
                let value = non_empty(ENV_LOG_DIR, value)?;
                if !Path::new(&value).is_absolute() {
                    return Err(ConfigError::RelativeLogDir(value));
                }
                Some(PathBuf::from(value))
            }
            None => None,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConfigError::EmptyValue(key))
    } else {
        Ok(trimmed.to_string())
    }
}
