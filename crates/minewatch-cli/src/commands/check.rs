use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;

use minewatch_core::MonitorConfig;

use super::load_config;

pub fn check(config_path: &Path) -> ExitCode {
    match load_config(config_path) {
        Ok(config) => {
            print!("{}", render(&config));
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn render(config: &MonitorConfig) -> String {
    let policy = &config.alerting;
    let mut out = String::new();
    let _ = writeln!(out, "state file: {}", config.state_file.display());
    let _ = writeln!(out, "lock file:  {}", config.lock_file.display());
    let _ = writeln!(
        out,
        "alerting:   after {}h down, remind every {}h, report every {}d, keep {}d",
        policy.down_alert_threshold_hours,
        policy.re_alert_interval_hours,
        policy.report_interval_days,
        policy.history_retention_days,
    );
    let _ = writeln!(
        out,
        "sensor:     {:?} (timeout {}s)",
        config.sensor.kind, config.sensor.timeout_secs
    );
    let _ = writeln!(out, "notifier:   {:?}", config.notifier.kind);
    let _ = writeln!(out, "\n{} site(s):", config.registry.len());
    for site in config.registry.iter() {
        let _ = writeln!(
            out,
            "  {}  expected={}  {}",
            site.name, site.expected_workers, site.url
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_resolved_settings() {
        let config = MonitorConfig::from_toml(
            r#"
[alerting]
down_alert_threshold_hours = 4

[[sites]]
name = "alpha"
url = "http://dash.example/a"
expected_workers = 57
"#,
            Path::new("/srv/minewatch"),
        )
        .unwrap();

        let out = render(&config);
        assert!(out.contains("state file: /srv/minewatch/minewatch_state.json"));
        assert!(out.contains("after 4h down, remind every 24h"));
        assert!(out.contains("1 site(s):"));
        assert!(out.contains("alpha  expected=57  http://dash.example/a"));
    }
}
