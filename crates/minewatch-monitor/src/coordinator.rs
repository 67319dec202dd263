//! One polling cycle across all sites.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use minewatch_core::{AlertPolicy, Site, SiteRegistry};
use minewatch_health::{Decision, Evaluation, HealthTracker, Sensor, SensorError};
use minewatch_notify::{Message, Notifier};
use minewatch_state::{Observation, RunState, SiteStatus, Timestamp};

use crate::messages;
use crate::report::{report_due, AggregateReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Alert,
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub kind: NotificationKind,
    pub delivered: bool,
}

/// What happened to one site during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    Evaluated {
        site: String,
        status: SiteStatus,
        worker_count: u32,
        notification: Option<NotificationOutcome>,
    },
    SensorFailed {
        site: String,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    NotDue,
    Sent,
    Failed,
}

/// Summary of one cycle, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: Vec<SiteOutcome>,
    pub aggregate_report: ReportOutcome,
}

impl CycleReport {
    pub fn sensor_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SiteOutcome::SensorFailed { .. }))
            .count()
    }

    pub fn down_sites(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    SiteOutcome::Evaluated {
                        status: SiteStatus::Down,
                        ..
                    }
                )
            })
            .count()
    }

    /// Notifications of `kind` that were attempted, and how many landed.
    pub fn notifications(&self, kind: NotificationKind) -> (usize, usize) {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                SiteOutcome::Evaluated {
                    notification: Some(n),
                    ..
                } if n.kind == kind => Some(n.delivered),
                _ => None,
            })
            .fold((0, 0), |(tried, ok), delivered| {
                (tried + 1, ok + usize::from(delivered))
            })
    }
}

/// Drives one cycle over the registry.
pub struct Coordinator {
    registry: SiteRegistry,
    tracker: HealthTracker,
    sensor: Arc<dyn Sensor>,
    notifier: Arc<dyn Notifier>,
}

impl Coordinator {
    pub fn new(
        registry: SiteRegistry,
        policy: AlertPolicy,
        sensor: Arc<dyn Sensor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            tracker: HealthTracker::new(policy),
            sensor,
            notifier,
        }
    }

    /// Run one cycle and return the state to persist.
    ///
    /// Per-site failures never abort the cycle: a sensor failure leaves
    /// that site's state untouched, and a delivery failure only withholds
    /// the side effect that depends on delivery.
    pub async fn run_cycle(&self, mut state: RunState, now: Timestamp) -> (RunState, CycleReport) {
        info!(sites = self.registry.len(), %now, "cycle started");

        let readings = self.fetch_all().await;
        let mut outcomes = Vec::with_capacity(self.registry.len());

        for (site, reading) in self.registry.iter().zip(readings) {
            let outcome = match reading {
                Ok(count) => self.process_site(site, &mut state, count, now).await,
                Err(e) => {
                    warn!(site = %site.name, error = %e, "could not read worker count, skipping site");
                    SiteOutcome::SensorFailed {
                        site: site.name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let aggregate_report = self.maybe_send_report(&mut state, now).await;

        let report = CycleReport {
            outcomes,
            aggregate_report,
        };
        info!(
            sensor_failures = report.sensor_failures(),
            down = report.down_sites(),
            report = ?report.aggregate_report,
            "cycle finished"
        );
        (state, report)
    }

    /// Fetch every site concurrently; results come back in registry order.
    async fn fetch_all(&self) -> Vec<Result<u32, SensorError>> {
        let mut set = JoinSet::new();
        for (idx, site) in self.registry.iter().enumerate() {
            let sensor = Arc::clone(&self.sensor);
            let url = site.url.clone();
            set.spawn(async move { (idx, sensor.fetch_worker_count(&url).await) });
        }

        let mut readings: Vec<Option<Result<u32, SensorError>>> =
            (0..self.registry.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, reading)) => readings[idx] = Some(reading),
                Err(e) => error!(error = %e, "sensor task failed"),
            }
        }

        readings
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(SensorError::Aborted("task did not complete".into()))))
            .collect()
    }

    async fn process_site(
        &self,
        site: &Site,
        state: &mut RunState,
        worker_count: u32,
        now: Timestamp,
    ) -> SiteOutcome {
        debug!(
            site = %site.name,
            workers = worker_count,
            expected = site.expected_workers,
            "worker count read"
        );

        let prev = state.site(&site.name);
        let observation = Observation::new(site, worker_count, now);
        let Evaluation {
            state: mut next,
            decision,
        } = self.tracker.evaluate(site, &prev, observation, now);

        let notification = match decision {
            Decision::None => None,
            Decision::Alert(alert) => {
                let delivered = self.deliver(&messages::alert_message(site, &alert)).await;
                if delivered {
                    next.record_alert(now);
                } else {
                    warn!(site = %site.name, "alert not delivered, will retry next cycle");
                }
                Some(NotificationOutcome {
                    kind: NotificationKind::Alert,
                    delivered,
                })
            }
            Decision::Recovery(notice) => {
                let delivered = self
                    .deliver(&messages::recovery_message(site, &notice))
                    .await;
                Some(NotificationOutcome {
                    kind: NotificationKind::Recovery,
                    delivered,
                })
            }
        };

        let status = next.last_status;
        state.set_site(&site.name, next);
        SiteOutcome::Evaluated {
            site: site.name.clone(),
            status,
            worker_count,
            notification,
        }
    }

    async fn maybe_send_report(&self, state: &mut RunState, now: Timestamp) -> ReportOutcome {
        let interval = self.tracker.policy().report_interval_days;
        if !report_due(state.last_aggregate_report, now, interval) {
            debug!(last = ?state.last_aggregate_report, "aggregate report not due");
            return ReportOutcome::NotDue;
        }

        let report = AggregateReport::build(&self.registry, state, now);
        if self.deliver(&messages::report_message(&report)).await {
            state.last_aggregate_report = Some(now);
            ReportOutcome::Sent
        } else {
            ReportOutcome::Failed
        }
    }

    async fn deliver(&self, message: &Message) -> bool {
        match self.notifier.send(message).await {
            Ok(()) => {
                info!(subject = %message.subject, "notification sent");
                true
            }
            Err(e) => {
                warn!(subject = %message.subject, error = %e, "notification delivery failed");
                false
            }
        }
    }
}

/// Best-effort notice that a run failed. Delivery errors are only logged.
pub async fn notify_fatal(notifier: &dyn Notifier, error: &anyhow::Error, now: Timestamp) {
    let message = messages::fatal_message(error, now);
    if let Err(e) = notifier.send(&message).await {
        error!(error = %e, "could not deliver failure notice");
    }
}
