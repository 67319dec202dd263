//! Domain types for the persisted run state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minewatch_core::Site;

/// Wall-clock instant, always UTC.
pub type Timestamp = DateTime<Utc>;

// ── Status ────────────────────────────────────────────────────────

/// Health of a site as of its last evaluated observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    /// Never observed.
    #[default]
    Unknown,
    Ok,
    Down,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SiteStatus::Unknown => "unknown",
            SiteStatus::Ok => "ok",
            SiteStatus::Down => "down",
        };
        f.write_str(s)
    }
}

// ── Observation ───────────────────────────────────────────────────

/// A single worker-count sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(with = "crate::timestamp")]
    pub timestamp: Timestamp,
    pub worker_count: u32,
    /// Status against the threshold in force when the sample was taken.
    /// Uptime ignores it and re-derives from `worker_count`.
    #[serde(default)]
    pub status: SiteStatus,
}

impl Observation {
    pub fn new(site: &Site, worker_count: u32, timestamp: Timestamp) -> Self {
        let status = if site.is_healthy(worker_count) {
            SiteStatus::Ok
        } else {
            SiteStatus::Down
        };
        Self {
            timestamp,
            worker_count,
            status,
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == SiteStatus::Down
    }
}

// ── Site state ────────────────────────────────────────────────────

/// Persisted per-site tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteState {
    pub last_status: SiteStatus,
    pub last_worker_count: Option<u32>,
    /// First failing sample of the current outage.
    #[serde(with = "crate::timestamp::option")]
    pub down_since: Option<Timestamp>,
    /// Last delivered down-alert for the current outage.
    #[serde(with = "crate::timestamp::option")]
    pub last_alert_time: Option<Timestamp>,
    /// Chronological samples inside the retention window.
    pub history: Vec<Observation>,
}

impl SiteState {
    /// Drop history entries at or before `cutoff`.
    pub fn prune_history(&mut self, cutoff: Timestamp) {
        self.history.retain(|entry| entry.timestamp > cutoff);
    }

    /// Mark a down-alert as delivered. Only call after the notifier
    /// confirmed the send.
    pub fn record_alert(&mut self, at: Timestamp) {
        self.last_alert_time = Some(at);
    }
}

// ── Run state ─────────────────────────────────────────────────────

/// The full persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub sites: BTreeMap<String, SiteState>,
    #[serde(default, alias = "last_weekly_report", with = "crate::timestamp::option")]
    pub last_aggregate_report: Option<Timestamp>,
}

impl RunState {
    /// State for `name`, or the `unknown` default when never seen.
    pub fn site(&self, name: &str) -> SiteState {
        self.sites.get(name).cloned().unwrap_or_default()
    }

    pub fn set_site(&mut self, name: &str, state: SiteState) {
        self.sites.insert(name.to_string(), state);
    }

    /// Decode a document. A flat single-site document is placed under
    /// `legacy_site`.
    pub fn from_json(bytes: &[u8], legacy_site: Option<&str>) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        let Some(object) = value.as_object() else {
            return Err("top-level value is not an object".to_string());
        };

        if !is_legacy_document(object) {
            return serde_json::from_value(value).map_err(|e| e.to_string());
        }

        let Some(name) = legacy_site else {
            return Err(
                "single-site state document but the registry does not hold exactly one site"
                    .to_string(),
            );
        };
        let legacy: LegacyDocument = serde_json::from_value(value).map_err(|e| e.to_string())?;
        let mut state = RunState {
            sites: BTreeMap::new(),
            last_aggregate_report: legacy.last_weekly_report,
        };
        state.set_site(name, legacy.site);
        Ok(state)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(self).map_err(|e| e.to_string())
    }
}

const LEGACY_KEYS: &[&str] = &[
    "last_status",
    "last_worker_count",
    "down_since",
    "last_alert_time",
    "history",
];

fn is_legacy_document(object: &serde_json::Map<String, serde_json::Value>) -> bool {
    !object.contains_key("sites") && LEGACY_KEYS.iter().any(|k| object.contains_key(*k))
}

/// Flat layout written by the single-site predecessor.
#[derive(Deserialize)]
struct LegacyDocument {
    #[serde(flatten)]
    site: SiteState,
    #[serde(default, with = "crate::timestamp::option")]
    last_weekly_report: Option<Timestamp>,
}
