//! Invoice engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                     | Default               |
//! |------------------------------|-----------------------|
//! | `STOCKBOOK_DB_PATH`          | `./stockbook_dev.db`  |
//! | `STOCKBOOK_MAX_CONNECTIONS`  | `5`                   |
//! | `STOCKBOOK_TX_TIMEOUT_MS`    | `5000`                |
//! | `STOCKBOOK_MAX_ATTEMPTS`     | `5`                   |
//! | `STOCKBOOK_RETRY_BACKOFF_MS` | `25` (at most 60000)  |
//! | `STOCKBOOK_NOTIFY_QUEUE`     | `256`                 |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use stockbook_db::DbConfig;

use crate::coordinator::TransactionPolicy;

/// Largest accepted `retry_backoff`.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Invoice engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size; concurrent invoice transactions beyond this wait for a connection
    pub max_connections: u32,

    /// Wall-clock budget of one transaction attempt
    pub transaction_timeout: Duration,

    /// Attempts per invoice before giving up with a concurrency conflict
    pub max_attempts: u32,

    /// Backoff before retry `n` is `n × retry_backoff`
    pub retry_backoff: Duration,

    /// Capacity of the post-commit notification queue
    pub notify_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./stockbook_dev.db"),
            max_connections: 5,
            transaction_timeout: Duration::from_millis(5_000),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(25),
            notify_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: lookup("STOCKBOOK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse(&lookup, "STOCKBOOK_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),

            transaction_timeout: parse(&lookup, "STOCKBOOK_TX_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.transaction_timeout),

            max_attempts: parse(&lookup, "STOCKBOOK_MAX_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts),

            retry_backoff: parse(&lookup, "STOCKBOOK_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),

            notify_queue_capacity: parse(&lookup, "STOCKBOOK_NOTIFY_QUEUE")?
                .unwrap_or(defaults.notify_queue_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::OutOfRange("STOCKBOOK_MAX_CONNECTIONS".to_string()));
        }
        if self.transaction_timeout.is_zero() {
            return Err(ConfigError::OutOfRange("STOCKBOOK_TX_TIMEOUT_MS".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::OutOfRange("STOCKBOOK_MAX_ATTEMPTS".to_string()));
        }
        if self.retry_backoff > MAX_RETRY_BACKOFF {
            return Err(ConfigError::OutOfRange("STOCKBOOK_RETRY_BACKOFF_MS".to_string()));
        }
        if self.notify_queue_capacity == 0 {
            return Err(ConfigError::OutOfRange("STOCKBOOK_NOTIFY_QUEUE".to_string()));
        }
        Ok(())
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    /// Retry and timeout settings for the coordinator.
    pub fn policy(&self) -> TransactionPolicy {
        TransactionPolicy {
            timeout: self.transaction_timeout,
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Value out of range for {0}")]
    OutOfRange(String),
}
