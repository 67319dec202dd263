//! External scraper sensor.
//!
//! Runs a user-supplied command (typically a headless-browser script)
//! that prints the worker count on stdout. `{url}` in the argv is replaced
//! with the site's dashboard URL.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::sensor::{bounded, Sensor, SensorError};

pub struct CommandSensor {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandSensor {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, SensorError> {
        if argv.is_empty() {
            return Err(SensorError::Config("command sensor requires a command".to_string()));
        }
        Ok(Self { argv, timeout })
    }

    async fn run(&self, url: &str) -> Result<u32, SensorError> {
        let args: Vec<String> = self.argv[1..]
            .iter()
            .map(|a| a.replace("{url}", url))
            .collect();

        let output = Command::new(&self.argv[0])
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SensorError::Command(format!("{}: {e}", self.argv[0])))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(program = %self.argv[0], %stderr, "scraper exited with failure");
            return Err(SensorError::Command(format!(
                "{} exited with {}",
                self.argv[0], output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        trimmed
            .parse::<u32>()
            .map_err(|_| SensorError::InvalidCount(trimmed.to_string()))
    }
}

#[async_trait]
impl Sensor for CommandSensor {
    async fn fetch_worker_count(&self, url: &str) -> Result<u32, SensorError> {
        bounded(self.timeout, self.run(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandSensor {
        let argv = ["sh", "-c", script, "scraper", "{url}"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        CommandSensor::new(argv, timeout).unwrap()
    }

    #[tokio::test]
    async fn parses_stdout_count() {
        let sensor = sh("echo 57", Duration::from_secs(5));
        assert_eq!(sensor.fetch_worker_count("http://x").await.unwrap(), 57);
    }

    #[tokio::test]
    async fn substitutes_url() {
        // $1 is the substituted url; print its length as the count.
        let sensor = sh("printf '%s' \"$1\" | wc -c", Duration::from_secs(5));
        assert_eq!(sensor.fetch_worker_count("http://abc").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let sensor = sh("echo 57; exit 3", Duration::from_secs(5));
        assert!(matches!(
            sensor.fetch_worker_count("http://x").await,
            Err(SensorError::Command(_))
        ));
    }

    #[tokio::test]
    async fn garbage_output_is_invalid_count() {
        let sensor = sh("echo 'Active Miners: ?'", Duration::from_secs(5));
        assert!(matches!(
            sensor.fetch_worker_count("http://x").await,
            Err(SensorError::InvalidCount(_))
        ));
    }

    #[tokio::test]
    async fn negative_output_is_invalid_count() {
        let sensor = sh("echo -4", Duration::from_secs(5));
        assert!(matches!(
            sensor.fetch_worker_count("http://x").await,
            Err(SensorError::InvalidCount(_))
        ));
    }

    #[tokio::test]
    async fn slow_scraper_times_out() {
        let sensor = sh("sleep 5; echo 57", Duration::from_millis(100));
        assert!(matches!(
            sensor.fetch_worker_count("http://x").await,
            Err(SensorError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn missing_program_is_failure() {
        let sensor = CommandSensor::new(
            vec!["/nonexistent/minewatch-scraper".to_string()],
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            sensor.fetch_worker_count("http://x").await,
            Err(SensorError::Command(_))
        ));
    }

    #[test]
    fn empty_argv_rejected() {
        assert!(CommandSensor::new(vec![], Duration::from_secs(1)).is_err());
    }
}
