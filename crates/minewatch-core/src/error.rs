//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// A malformed or missing configuration. Always fatal for the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no sites configured")]
    NoSites,

    #[error("site name must not be empty")]
    EmptySiteName,

    #[error("duplicate site name: {0}")]
    DuplicateSite(String),

    #[error("site {0}: expected_workers must be positive")]
    ZeroExpectedWorkers(String),

    #[error("site {0}: url must not be empty")]
    MissingUrl(String),

    #[error("invalid alerting policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid sensor config: {0}")]
    InvalidSensor(String),

    #[error("invalid notifier config: {0}")]
    InvalidNotifier(String),
}
