//! Plain-text rendering of notifications.

use chrono::TimeDelta;

use minewatch_core::Site;
use minewatch_health::{DownAlert, RecoveryNotice};
use minewatch_notify::Message;
use minewatch_state::{SiteStatus, Timestamp};

use crate::report::AggregateReport;

const STAMP: &str = "%Y-%m-%d %H:%M UTC";

/// "X hours Y minutes", or "Y minutes" under an hour. Minutes truncate.
pub fn format_duration(d: TimeDelta) -> String {
    let total_minutes = d.num_minutes().max(0);
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    let unit = |n: i64, word: &str| format!("{n} {word}{}", if n == 1 { "" } else { "s" });
    match (h, m) {
        (0, m) => unit(m, "minute"),
        (h, 0) => unit(h, "hour"),
        (h, m) => format!("{} {}", unit(h, "hour"), unit(m, "minute")),
    }
}

/// `95.8%`, or `insufficient data` when the window held no samples.
pub fn format_uptime(uptime: Option<f64>) -> String {
    match uptime {
        Some(pct) => format!("{pct:.1}%"),
        None => "insufficient data".to_string(),
    }
}

pub fn alert_message(site: &Site, alert: &DownAlert) -> Message {
    let duration = format_duration(alert.outage_duration);
    let noun = if alert.workers_down == 1 { "WORKER" } else { "WORKERS" };
    let subject = format!(
        "ALERT: {} {noun} DOWN AT {} FOR {}",
        alert.workers_down,
        site.name,
        duration.to_uppercase()
    );

    let mut body = format!(
        "{} worker(s) offline at {} for {duration}.\n\n\
         Expected workers: {}\n\
         Current workers:  {}\n\
         Workers offline:  {}\n\
         Down since:       {}\n\
         Duration:         {duration}\n",
        alert.workers_down,
        site.name,
        alert.expected_workers,
        alert.worker_count,
        alert.workers_down,
        alert.down_since.format(STAMP),
    );
    if !alert.first_for_outage {
        body.push_str("\nThis outage is still open; this is a reminder.\n");
    }
    push_site_links(&mut body, site);
    Message::new(subject, body)
}

pub fn recovery_message(site: &Site, notice: &RecoveryNotice) -> Message {
    let duration = format_duration(notice.outage_duration);
    let subject = format!("RECOVERY: {} back online", site.name);
    let previous = notice
        .previous_worker_count
        .map_or_else(|| "unknown".to_string(), |c| c.to_string());
    let mut body = format!(
        "All {} expected workers at {} are back online after {duration}.\n\n\
         Current workers:  {}\n\
         Previous count:   {previous}\n\
         Total downtime:   {duration}\n",
        site.expected_workers, site.name, notice.worker_count,
    );
    push_site_links(&mut body, site);
    Message::new(subject, body)
}

pub fn report_message(report: &AggregateReport) -> Message {
    let subject = format!(
        "Uptime report: {}/{} sites healthy",
        report.healthy_count(),
        report.sites.len()
    );

    let mut body = format!("Uptime report generated {}\n", report.generated_at.format(STAMP));
    for site in &report.sites {
        let status = match site.status {
            SiteStatus::Ok => "all workers online",
            SiteStatus::Down => "workers offline",
            SiteStatus::Unknown => "no data yet",
        };
        let last = site
            .last_worker_count
            .map_or_else(|| "n/a".to_string(), |c| c.to_string());
        body.push_str(&format!(
            "\n{}\n  Status:         {status}\n  Expected:       {}\n  Last count:     {last}\n  7-day uptime:   {}\n  30-day uptime:  {}\n",
            site.name,
            site.expected_workers,
            format_uptime(site.uptime_7d),
            format_uptime(site.uptime_30d),
        ));
        if let Some(since) = site.down_since {
            body.push_str(&format!("  Down since:     {}\n", since.format(STAMP)));
        }
        body.push_str(&format!("  Dashboard:      {}\n", site.url));
    }
    Message::new(subject, body)
}

pub fn fatal_message(error: &anyhow::Error, at: Timestamp) -> Message {
    let body = format!(
        "The minewatch run at {} failed and monitoring may be interrupted.\n\nError: {error:#}\n",
        at.format(STAMP),
    );
    Message::new("minewatch run failed", body)
}

fn push_site_links(body: &mut String, site: &Site) {
    body.push_str(&format!("\nDashboard: {}\n", site.url));
    if let Some(client) = &site.client_id {
        body.push_str(&format!("Client ID: {client}\n"));
    }
    if let Some(machines) = &site.machine_types {
        body.push_str(&format!("Machine types: {machines}\n"));
    }
    if let Some(support) = &site.support_url {
        body.push_str(&format!("Open a support ticket: {support}\n"));
    }
}
