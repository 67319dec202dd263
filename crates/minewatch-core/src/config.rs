//! minewatch.toml configuration parser.
//!
//! Thresholds, sensor, and notifier settings are plain values threaded
//! through the coordinator and tracker, so tests can build any policy
//! without touching a file.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::{Site, SiteRegistry};

/// Default extraction pattern for worker-count dashboards.
pub const DEFAULT_COUNT_PATTERN: &str = r"Active Miners\s+(\d+)";

const DEFAULT_STATE_FILE: &str = "minewatch_state.json";
const DEFAULT_LOCK_FILE: &str = "minewatch.lock";

/// Ten years, as hours and as days.
const MAX_POLICY_HOURS: u32 = 10 * 366 * 24;
const MAX_POLICY_DAYS: u32 = 10 * 366;

/// Debounce and reporting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    /// A site must be down strictly longer than this before alerting.
    pub down_alert_threshold_hours: u32,
    /// Minimum gap between alerts for the same unresolved outage.
    pub re_alert_interval_hours: u32,
    /// Aggregate report cadence, in whole calendar days.
    pub report_interval_days: u32,
    /// Observations older than this are pruned from history.
    pub history_retention_days: u32,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            down_alert_threshold_hours: 6,
            re_alert_interval_hours: 24,
            report_interval_days: 7,
            history_retention_days: 30,
        }
    }
}

impl AlertPolicy {
    pub fn down_alert_threshold(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.down_alert_threshold_hours))
    }

    pub fn re_alert_interval(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.re_alert_interval_hours))
    }

    pub fn history_retention(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.history_retention_days))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let bounded = |name: &str, value: u32, min: u32, max: u32| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidPolicy(format!(
                    "{name} must be between {min} and {max}, got {value}"
                )))
            }
        };
        bounded(
            "down_alert_threshold_hours",
            self.down_alert_threshold_hours,
            0,
            MAX_POLICY_HOURS,
        )?;
        bounded(
            "re_alert_interval_hours",
            self.re_alert_interval_hours,
            1,
            MAX_POLICY_HOURS,
        )?;
        bounded(
            "report_interval_days",
            self.report_interval_days,
            1,
            MAX_POLICY_DAYS,
        )?;
        bounded(
            "history_retention_days",
            self.history_retention_days,
            1,
            MAX_POLICY_DAYS,
        )
    }
}

/// Which sensor implementation resolves worker counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    #[default]
    Http,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    /// Upper bound on a single fetch, in seconds.
    pub timeout_secs: u64,
    /// Extraction regex; capture group 1 holds the count.
    pub pattern: Option<String>,
    /// Scraper argv for `kind = "command"`. `{url}` is substituted.
    pub command: Vec<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Http,
            timeout_secs: 60,
            pattern: None,
            command: Vec::new(),
        }
    }
}

impl SensorConfig {
    pub fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(DEFAULT_COUNT_PATTERN)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidSensor(
                "timeout_secs must be positive".to_string(),
            ));
        }
        let re = Regex::new(self.pattern())
            .map_err(|e| ConfigError::InvalidSensor(format!("bad pattern: {e}")))?;
        if re.captures_len() < 2 {
            return Err(ConfigError::InvalidSensor(
                "pattern needs a capture group for the count".to_string(),
            ));
        }
        if self.kind == SensorKind::Command && self.command.is_empty() {
            return Err(ConfigError::InvalidSensor(
                "command sensor requires a command".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which transport delivers notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    #[default]
    Log,
    Webhook,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    /// Endpoint for `kind = "webhook"`.
    pub url: Option<String>,
    /// Sender argv for `kind = "command"`. `{subject}` is substituted.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            url: None,
            command: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl NotifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            NotifierKind::Webhook if self.url.as_deref().is_none_or(str::is_empty) => Err(
                ConfigError::InvalidNotifier("webhook notifier requires a url".to_string()),
            ),
            NotifierKind::Command if self.command.is_empty() => Err(
                ConfigError::InvalidNotifier("command notifier requires a command".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// On-disk layout of minewatch.toml.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    state_file: Option<PathBuf>,
    lock_file: Option<PathBuf>,
    #[serde(default)]
    alerting: AlertPolicy,
    #[serde(default)]
    sensor: SensorConfig,
    #[serde(default)]
    notifier: NotifierConfig,
    #[serde(default)]
    sites: Vec<Site>,
}

/// Fully resolved and validated configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub state_file: PathBuf,
    pub lock_file: PathBuf,
    pub alerting: AlertPolicy,
    pub sensor: SensorConfig,
    pub notifier: NotifierConfig,
    pub registry: SiteRegistry,
}

impl MonitorConfig {
    /// Load and validate a config file. Relative paths inside it resolve
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid(e) => e,
        })
    }

    /// Parse config text; `base_dir` anchors relative paths.
    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        Self::parse(content, base_dir).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: base_dir.join("<inline>"),
                source,
            },
            ParseFailure::Invalid(e) => e,
        })
    }

    fn parse(content: &str, base_dir: &Path) -> Result<Self, ParseFailure> {
        let file: ConfigFile = toml::from_str(content).map_err(ParseFailure::Toml)?;

        file.alerting.validate().map_err(ParseFailure::Invalid)?;
        file.sensor.validate().map_err(ParseFailure::Invalid)?;
        file.notifier.validate().map_err(ParseFailure::Invalid)?;
        let registry = SiteRegistry::new(file.sites).map_err(ParseFailure::Invalid)?;

        let resolve = |p: Option<PathBuf>, default: &str| {
            let p = p.unwrap_or_else(|| PathBuf::from(default));
            if p.is_absolute() { p } else { base_dir.join(p) }
        };

        Ok(Self {
            state_file: resolve(file.state_file, DEFAULT_STATE_FILE),
            lock_file: resolve(file.lock_file, DEFAULT_LOCK_FILE),
            alerting: file.alerting,
            sensor: file.sensor,
            notifier: file.notifier,
            registry,
        })
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(ConfigError),
}
