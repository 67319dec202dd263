//! HTTP(S) dashboard sensor.
//!
//! Fetches the dashboard page and runs the count extractor over it.
//! Pages that only render their counts client-side go through
//! [`crate::CommandSensor`] with an external headless scraper.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::sensor::{bounded, CountExtractor, Sensor, SensorError};

pub struct HttpSensor {
    client: Client,
    extractor: CountExtractor,
    timeout: Duration,
}

impl HttpSensor {
    pub fn new(extractor: CountExtractor, timeout: Duration) -> Result<Self, SensorError> {
        let client = Client::builder()
            .user_agent(concat!("minewatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SensorError::Config(e.to_string()))?;
        Ok(Self {
            client,
            extractor,
            timeout,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, SensorError> {
        let url = dashboard_url(url)?;

        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %url, "dashboard non-2xx");
            return Err(SensorError::Status(status.as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| transport_error(e, self.timeout))
    }
}

/// Only `http` and `https` URLs with a host are fetched.
fn dashboard_url(raw: &str) -> Result<Url, SensorError> {
    let url = Url::parse(raw).map_err(|_| SensorError::UnsupportedUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(SensorError::UnsupportedUrl(raw.to_string())),
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> SensorError {
    if e.is_timeout() {
        SensorError::Timeout(timeout)
    } else if e.is_connect() {
        SensorError::Connect(e.to_string())
    } else {
        SensorError::Request(e.to_string())
    }
}

#[async_trait]
impl Sensor for HttpSensor {
    async fn fetch_worker_count(&self, url: &str) -> Result<u32, SensorError> {
        bounded(self.timeout, async {
            let page = self.fetch_page(url).await?;
            match self.extractor.extract(&page) {
                Some(count) => Ok(count),
                None => {
                    let sample: String = page.chars().take(200).collect();
                    debug!(%url, %sample, "no worker count on page");
                    Err(SensorError::NotFound)
                }
            }
        })
        .await
    }
}
