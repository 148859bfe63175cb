//! Runtime configuration for embedding callers.
//!
//! # Responsibility
//! - Describe where the survey database lives and how long writers wait for
//!   the SQLite write lock.
//! - Optionally carry the logging setup so one document configures the core.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.

use crate::logging::LogConfig;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub db: DbConfig,
    pub log: Option<LogConfig>,
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// How long a writer waits for a concurrent sync to release the lock.
    pub busy_timeout_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DbConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl CoreConfig {
    /// Parses a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DbConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.db.path, None);
        assert_eq!(config.db.busy_timeout(), Duration::from_secs(5));
        assert!(config.log.is_none());
    }

    #[test]
    fn parses_db_and_log_sections() {
        let config = CoreConfig::from_json_str(
            r#"{
                "db": { "path": "/tmp/surveys.sqlite3", "busy_timeout_ms": 250 },
                "log": { "level": "debug", "dir": "/tmp/survey-logs" }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.db,
            DbConfig {
                path: Some(PathBuf::from("/tmp/surveys.sqlite3")),
                busy_timeout_ms: 250,
            }
        );
        let log = config.log.unwrap();
        assert_eq!(log.level, "debug");
        assert_eq!(log.dir, PathBuf::from("/tmp/survey-logs"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{ "database": {} }"#).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }
}
