//! minewatch-monitor — the monitoring run coordinator.
//!
//! One [`Coordinator::run_cycle`] call is one scheduled invocation:
//!
//! ```text
//! run_cycle(RunState, now)
//!   ├── fetch every site's worker count concurrently (Sensor)
//!   ├── per site, in registry order:
//!   │   ├── sensor failure → skip, state untouched
//!   │   └── HealthTracker::evaluate → deliver alert/recovery (Notifier)
//!   │         └── alert delivered → record last_alert_time
//!   ├── aggregate report due? → deliver → record last_aggregate_report
//!   └── return (RunState, CycleReport)
//! ```
//!
//! The coordinator never touches disk. The caller loads the state before
//! the cycle and saves the returned state once afterwards.

pub mod coordinator;
pub mod messages;
pub mod report;

pub use coordinator::{
    notify_fatal, Coordinator, CycleReport, NotificationKind, NotificationOutcome, ReportOutcome,
    SiteOutcome,
};
pub use report::{report_due, AggregateReport, SiteSummary};
