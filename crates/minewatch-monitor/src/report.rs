//! Aggregate uptime report.

use minewatch_core::SiteRegistry;
use minewatch_health::uptime_percentage;
use minewatch_state::{RunState, SiteStatus, Timestamp};

/// One site's line in the aggregate report.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub name: String,
    pub url: String,
    pub expected_workers: u32,
    pub status: SiteStatus,
    pub last_worker_count: Option<u32>,
    pub down_since: Option<Timestamp>,
    pub uptime_7d: Option<f64>,
    pub uptime_30d: Option<f64>,
}

/// Snapshot of every registered site, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub generated_at: Timestamp,
    pub sites: Vec<SiteSummary>,
}

impl AggregateReport {
    /// Sites present in `state` but no longer registered are left out.
    pub fn build(registry: &SiteRegistry, state: &RunState, now: Timestamp) -> Self {
        let sites = registry
            .iter()
            .map(|site| {
                let s = state.site(&site.name);
                SiteSummary {
                    name: site.name.clone(),
                    url: site.url.clone(),
                    expected_workers: site.expected_workers,
                    status: s.last_status,
                    last_worker_count: s.last_worker_count,
                    down_since: s.down_since,
                    uptime_7d: uptime_percentage(&s.history, site.expected_workers, now, 7),
                    uptime_30d: uptime_percentage(&s.history, site.expected_workers, now, 30),
                }
            })
            .collect();
        Self {
            generated_at: now,
            sites,
        }
    }

    pub fn healthy_count(&self) -> usize {
        self.sites
            .iter()
            .filter(|s| s.status == SiteStatus::Ok)
            .count()
    }
}

/// Whether the aggregate report is due.
///
/// Compares whole calendar days between the UTC dates, so a report sent
/// late one morning is due again from midnight of the qualifying day.
pub fn report_due(last: Option<Timestamp>, now: Timestamp, interval_days: u32) -> bool {
    match last {
        None => true,
        Some(last) => {
            let elapsed = (now.date_naive() - last.date_naive()).num_days();
            elapsed >= i64::from(interval_days)
        }
    }
}
