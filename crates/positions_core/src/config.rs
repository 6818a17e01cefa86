//! Process configuration loaded from the environment.
//!
//! # Responsibility
//! - Resolve the store location from `DATABASE_URL`.
//! - Resolve optional logging settings.
//!
//! # Invariants
//! - A missing or blank `DATABASE_URL` is a fatal startup error.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const LOG_LEVEL_VAR: &str = "POSITIONS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "POSITIONS_LOG_DIR";

const URL_PREFIXES: [&str; 3] = ["sqlite://", "sqlite:", "file:"];

/// Where the positions relation lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Private in-memory database, discarded with the connection.
    Memory,
    /// SQLite database file.
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parses a connection string such as `sqlite://data/positions.db`,
    /// `file:positions.db`, a bare path, or `:memory:`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let location = URL_PREFIXES
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);

        match location {
            "" => Err(ConfigError::InvalidDatabaseUrl(raw.to_string())),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    /// Opens a migrated connection to this target.
    pub fn open(&self) -> DbResult<Connection> {
        match self {
            Self::Memory => open_db_in_memory(),
            Self::File(path) => open_db(path),
        }
    }
}

/// Errors while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `DATABASE_URL` is unset or blank.
    MissingDatabaseUrl,
    /// `DATABASE_URL` has no usable location.
    InvalidDatabaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDatabaseUrl => write!(f, "{DATABASE_URL_VAR} is not defined"),
            Self::InvalidDatabaseUrl(raw) => {
                write!(f, "{DATABASE_URL_VAR} `{raw}` does not name a database")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseTarget,
    pub log_level: String,
    /// File logging is enabled only when this is set.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let raw_url = non_blank(DATABASE_URL_VAR).ok_or(ConfigError::MissingDatabaseUrl)?;
        let database = DatabaseTarget::parse(&raw_url)?;
        let log_level = non_blank(LOG_LEVEL_VAR)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| default_log_level().to_string());
        let log_dir = non_blank(LOG_DIR_VAR).map(|value| value.trim().to_string());

        Ok(Self {
            database,
            log_level,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DatabaseTarget, DATABASE_URL_VAR, LOG_DIR_VAR};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_or_blank_database_url_is_fatal() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[(DATABASE_URL_VAR, "  ")])).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
    }

    #[test]
    fn database_url_prefixes_are_stripped() {
        assert_eq!(
            DatabaseTarget::parse("sqlite://data/positions.db").unwrap(),
            DatabaseTarget::File(PathBuf::from("data/positions.db"))
        );
        assert_eq!(
            DatabaseTarget::parse("file:positions.db").unwrap(),
            DatabaseTarget::File(PathBuf::from("positions.db"))
        );
        assert_eq!(
            DatabaseTarget::parse("sqlite::memory:").unwrap(),
            DatabaseTarget::Memory
        );
        assert!(matches!(
            DatabaseTarget::parse("sqlite://"),
            Err(ConfigError::InvalidDatabaseUrl(_))
        ));
    }

    #[test]
    fn logging_defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[(DATABASE_URL_VAR, ":memory:")])).unwrap();
        assert_eq!(config.database, DatabaseTarget::Memory);
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);

        let config = AppConfig::from_lookup(lookup(&[
            (DATABASE_URL_VAR, ":memory:"),
            (LOG_DIR_VAR, "/var/log/positions"),
        ]))
        .unwrap();
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/positions"));
    }

    #[test]
    fn memory_target_opens_migrated_connection() {
        let conn = DatabaseTarget::Memory.open().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
