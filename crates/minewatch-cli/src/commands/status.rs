use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use tracing::error;

use minewatch_core::MonitorConfig;
use minewatch_monitor::messages::format_uptime;
use minewatch_monitor::AggregateReport;
use minewatch_state::{RunState, StateStore, Timestamp};

use super::load_config;

pub fn status(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let store = StateStore::new(&config.state_file);
    let legacy_site = config.registry.single().map(|s| s.name.as_str());
    match store.load(legacy_site) {
        Ok(state) => {
            print!("{}", render(&config, &state, Utc::now()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(path = %store.path().display(), error = %e, "could not load state");
            ExitCode::FAILURE
        }
    }
}

fn render(config: &MonitorConfig, state: &RunState, now: Timestamp) -> String {
    let report = AggregateReport::build(&config.registry, state, now);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<20} {:<8} {:>6} {:>9} {:>9}  DOWN SINCE",
        "SITE", "STATUS", "COUNT", "7D", "30D"
    );
    for site in &report.sites {
        let count = site
            .last_worker_count
            .map_or_else(|| "-".to_string(), |c| format!("{c}/{}", site.expected_workers));
        let since = site
            .down_since
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(
            out,
            "{:<20} {:<8} {:>6} {:>9} {:>9}  {since}",
            site.name,
            site.status.to_string(),
            count,
            format_uptime(site.uptime_7d),
            format_uptime(site.uptime_30d),
        );
    }

    let last = state
        .last_aggregate_report
        .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string());
    let _ = writeln!(out, "\nLast uptime report: {last}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use minewatch_state::{Observation, SiteStatus};

    const CONFIG: &str = r#"
[[sites]]
name = "alpha"
url = "http://dash.example/a"
expected_workers = 10

[[sites]]
name = "beta"
url = "http://dash.example/b"
expected_workers = 4
"#;

    #[test]
    fn renders_every_registered_site() {
        let config = MonitorConfig::from_toml(CONFIG, Path::new("/tmp")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let alpha_site = config.registry.get("alpha").unwrap();

        let mut state = RunState::default();
        let mut alpha = state.site("alpha");
        alpha.last_status = SiteStatus::Down;
        alpha.last_worker_count = Some(7);
        alpha.down_since = Some(now - TimeDelta::hours(2));
        alpha.history = vec![
            Observation::new(alpha_site, 10, now - TimeDelta::hours(3)),
            Observation::new(alpha_site, 7, now - TimeDelta::hours(2)),
        ];
        state.set_site("alpha", alpha);

        let out = render(&config, &state, now);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("SITE"));
        assert!(lines[1].starts_with("alpha"));
        assert!(lines[1].contains("down"));
        assert!(lines[1].contains("7/10"));
        assert!(lines[1].contains("50.0%"));
        assert!(lines[1].contains("2024-06-01 10:00"));
        assert!(lines[2].starts_with("beta"));
        assert!(lines[2].contains("unknown"));
        assert!(lines[2].contains("insufficient data"));
        assert!(out.contains("Last uptime report: never"));
    }
}
