//! Sensor interface: the unreliable source of worker counts.
//!
//! A sensor resolves to exactly one of a non-negative count or a
//! [`SensorError`]. Whatever goes wrong inside (timeouts, layout changes,
//! transport errors) never surfaces as a zero count.

use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use minewatch_core::{SensorConfig, SensorKind};

use crate::command::CommandSensor;
use crate::dashboard::HttpSensor;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("dashboard returned HTTP {0}")]
    Status(u16),

    #[error("worker count not found on page")]
    NotFound,

    #[error("scraper failed: {0}")]
    Command(String),

    #[error("scraper output is not a count: {0:?}")]
    InvalidCount(String),

    #[error("invalid sensor config: {0}")]
    Config(String),

    #[error("sensor task aborted: {0}")]
    Aborted(String),
}

/// Produces the current online worker count for a dashboard URL.
#[async_trait]
pub trait Sensor: Send + Sync {
    async fn fetch_worker_count(&self, url: &str) -> Result<u32, SensorError>;
}

/// Build the sensor selected by `config`.
pub fn sensor_from_config(config: &SensorConfig) -> Result<Arc<dyn Sensor>, SensorError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let sensor: Arc<dyn Sensor> = match config.kind {
        SensorKind::Http => {
            let extractor = CountExtractor::new(config.pattern())
                .map_err(|e| SensorError::Config(e.to_string()))?;
            Arc::new(HttpSensor::new(extractor, timeout)?)
        }
        SensorKind::Command => Arc::new(CommandSensor::new(config.command.clone(), timeout)?),
    };
    Ok(sensor)
}

/// Bound `fut` by `timeout`; expiry is a sensor failure.
pub(crate) async fn bounded<F>(timeout: Duration, fut: F) -> Result<u32, SensorError>
where
    F: Future<Output = Result<u32, SensorError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| SensorError::Timeout(timeout))?
}

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>|<[^>]*>").expect("static regex")
});
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Best-effort numeric extraction from a dashboard page.
///
/// Tries the pattern against the page's visible text first, then against
/// the raw markup. Capture group 1 must hold the count.
#[derive(Debug, Clone)]
pub struct CountExtractor {
    pattern: Regex,
}

impl CountExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn extract(&self, page: &str) -> Option<u32> {
        let text = visible_text(page);
        self.capture(&text).or_else(|| self.capture(page))
    }

    fn capture(&self, haystack: &str) -> Option<u32> {
        self.pattern
            .captures(haystack)?
            .get(1)?
            .as_str()
            .trim()
            .parse()
            .ok()
    }
}

fn visible_text(html: &str) -> String {
    let stripped = TAG.replace_all(html, " ");
    let decoded = stripped.replace("&nbsp;", " ");
    SPACE.replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use minewatch_core::DEFAULT_COUNT_PATTERN;

    fn extractor() -> CountExtractor {
        CountExtractor::new(DEFAULT_COUNT_PATTERN).unwrap()
    }

    #[test]
    fn extracts_from_nested_markup() {
        let page = r#"<div class="card"><span>Active Miners</span>
            <span class="value">57</span></div>"#;
        assert_eq!(extractor().extract(page), Some(57));
    }

    #[test]
    fn extracts_from_plain_text() {
        assert_eq!(extractor().extract("Active Miners 12 Inactive 3"), Some(12));
    }

    #[test]
    fn ignores_script_bodies() {
        let page = "<script>var t = 'Active Miners 99';</script><p>Active Miners&nbsp;4</p>";
        assert_eq!(extractor().extract(page), Some(4));
    }

    #[test]
    fn falls_back_to_raw_markup() {
        let ex = CountExtractor::new(r#"data-active="(\d+)""#).unwrap();
        assert_eq!(ex.extract(r#"<div data-active="31"></div>"#), Some(31));
    }

    #[test]
    fn missing_label_is_none() {
        assert_eq!(extractor().extract("<p>Hashrate 1.2 PH/s</p>"), None);
    }

    #[test]
    fn non_numeric_is_none() {
        assert_eq!(extractor().extract("Active Miners --"), None);
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let result = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(SensorError::Timeout(_))));
    }

    #[test]
    fn factory_rejects_empty_command() {
        let config = SensorConfig {
            kind: SensorKind::Command,
            ..SensorConfig::default()
        };
        assert!(matches!(sensor_from_config(&config), Err(SensorError::Config(_))));
    }
}
