//! minewatch-core — site registry and configuration for minewatch.
//!
//! The registry is the leaf of the system: an ordered, validated list of
//! monitored sites, each with a unique name and an expected-worker
//! threshold. It is loaded once per run from `minewatch.toml` and is
//! read-only from then on.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{
    AlertPolicy, MonitorConfig, NotifierConfig, NotifierKind, SensorConfig, SensorKind,
    DEFAULT_COUNT_PATTERN,
};
pub use error::ConfigError;
pub use registry::{Site, SiteRegistry};
