//! minewatch-health — per-site health tracking for minewatch.
//!
//! Turns a noisy series of worker-count samples into debounced down and
//! recovery decisions, answers rolling uptime questions, and provides the
//! sensors that produce the samples.
//!
//! # Architecture
//!
//! ```text
//! Sensor (HttpSensor | CommandSensor)
//!   └── fetch_worker_count(url) → u32 | SensorError   (bounded by timeout)
//!
//! HealthTracker
//!   └── evaluate(site, prev SiteState, Observation, now)
//!         → Evaluation { state, decision: None | Alert | Recovery }
//!
//! uptime_percentage(history, expected, now, days) → Option<f64>
//! ```
//!
//! # Debounce
//!
//! An outage starts at its first failing sample. It is announced only
//! once it has lasted longer than `down_alert_threshold_hours`, then
//! re-announced at most every `re_alert_interval_hours`. A recovery is
//! announced only for outages that lasted past the alert threshold.

pub mod command;
pub mod dashboard;
pub mod sensor;
pub mod tracker;
pub mod uptime;

pub use command::CommandSensor;
pub use dashboard::HttpSensor;
pub use sensor::{sensor_from_config, CountExtractor, Sensor, SensorError};
pub use tracker::{Decision, DownAlert, Evaluation, HealthTracker, RecoveryNotice};
pub use uptime::uptime_percentage;
