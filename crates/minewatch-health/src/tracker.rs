//! Down/recovery decision logic for a single site.
//!
//! The tracker is pure: it takes the previous persisted state and one
//! observation and returns the next state plus at most one decision. The
//! alert timestamp is never set here; the caller records it once the
//! notifier confirms delivery, so an undelivered alert is retried on the
//! next cycle.

use chrono::TimeDelta;
use tracing::{debug, info};

use minewatch_core::{AlertPolicy, Site};
use minewatch_state::{Observation, SiteState, SiteStatus, Timestamp};

/// A site has been down long enough to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownAlert {
    pub site: String,
    pub expected_workers: u32,
    pub worker_count: u32,
    pub workers_down: u32,
    pub down_since: Timestamp,
    pub outage_duration: TimeDelta,
    /// `false` for daily reminders about the same outage.
    pub first_for_outage: bool,
}

/// An outage longer than the alert threshold has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryNotice {
    pub site: String,
    pub worker_count: u32,
    pub previous_worker_count: Option<u32>,
    pub outage_duration: TimeDelta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    None,
    Alert(DownAlert),
    Recovery(RecoveryNotice),
}

/// Result of feeding one observation to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: SiteState,
    pub decision: Decision,
}

/// Applies an [`AlertPolicy`] to per-site observations.
#[derive(Debug, Clone, Copy)]
pub struct HealthTracker {
    policy: AlertPolicy,
}

impl HealthTracker {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Evaluate `observation` against `prev` at time `now`.
    pub fn evaluate(
        &self,
        site: &Site,
        prev: &SiteState,
        observation: Observation,
        now: Timestamp,
    ) -> Evaluation {
        let mut state = prev.clone();
        // A cutoff before the representable range keeps the whole history.
        if let Some(cutoff) = now.checked_sub_signed(self.policy.history_retention()) {
            state.prune_history(cutoff);
        }
        state.history.push(observation.clone());

        let decision = if observation.is_down() {
            self.on_down(site, prev, &mut state, &observation, now)
        } else {
            self.on_ok(site, prev, &mut state, &observation, now)
        };

        state.last_worker_count = Some(observation.worker_count);
        Evaluation { state, decision }
    }

    fn on_down(
        &self,
        site: &Site,
        prev: &SiteState,
        state: &mut SiteState,
        observation: &Observation,
        now: Timestamp,
    ) -> Decision {
        state.last_status = SiteStatus::Down;

        let down_since = *state.down_since.get_or_insert(observation.timestamp);
        if prev.down_since.is_none() {
            info!(
                site = %site.name,
                workers = observation.worker_count,
                expected = site.expected_workers,
                "workers down, outage clock started"
            );
        }

        let outage = now - down_since;
        let threshold = self.policy.down_alert_threshold();
        if outage <= threshold {
            debug!(
                site = %site.name,
                hours_down = hours(outage),
                hours_left = hours(threshold - outage),
                "below alert threshold"
            );
            return Decision::None;
        }

        if let Some(last) = prev.last_alert_time {
            let since_alert = now - last;
            if since_alert <= self.policy.re_alert_interval() {
                debug!(
                    site = %site.name,
                    hours_since_alert = hours(since_alert),
                    "alert suppressed, already notified recently"
                );
                return Decision::None;
            }
        }

        info!(
            site = %site.name,
            hours_down = hours(outage),
            reminder = prev.last_alert_time.is_some(),
            "alert due"
        );
        Decision::Alert(DownAlert {
            site: site.name.clone(),
            expected_workers: site.expected_workers,
            worker_count: observation.worker_count,
            workers_down: site.workers_down(observation.worker_count),
            down_since,
            outage_duration: outage,
            first_for_outage: prev.last_alert_time.is_none(),
        })
    }

    fn on_ok(
        &self,
        site: &Site,
        prev: &SiteState,
        state: &mut SiteState,
        observation: &Observation,
        now: Timestamp,
    ) -> Decision {
        if observation.worker_count > site.expected_workers {
            info!(
                site = %site.name,
                workers = observation.worker_count,
                expected = site.expected_workers,
                "worker count exceeds expected"
            );
        }

        let decision = match (prev.last_status, prev.down_since) {
            (SiteStatus::Down, Some(since)) => {
                let outage = now - since;
                if outage > self.policy.down_alert_threshold() {
                    info!(site = %site.name, hours_down = hours(outage), "recovered");
                    Decision::Recovery(RecoveryNotice {
                        site: site.name.clone(),
                        worker_count: observation.worker_count,
                        previous_worker_count: prev.last_worker_count,
                        outage_duration: outage,
                    })
                } else {
                    info!(
                        site = %site.name,
                        hours_down = hours(outage),
                        "recovered before the alert threshold, not notifying"
                    );
                    Decision::None
                }
            }
            _ => Decision::None,
        };

        state.down_since = None;
        state.last_alert_time = None;
        state.last_status = SiteStatus::Ok;
        decision
    }
}

fn hours(d: TimeDelta) -> f64 {
    d.num_seconds() as f64 / 3600.0
}
