//! JSON webhook transport.
//!
//! POSTs `{"subject": ..., "body": ...}` to an HTTP(S) endpoint, such as
//! a chat incoming-webhook or a relay that forwards to mail.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::notifier::{DeliveryError, Message, Notifier};

pub struct WebhookNotifier {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let parsed = Url::parse(url).map_err(|_| DeliveryError::UnsupportedUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(DeliveryError::UnsupportedUrl(url.to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!("minewatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Config(e.to_string()))?;
        Ok(Self {
            client,
            url: parsed,
            timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> DeliveryError {
        if e.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else if e.is_connect() {
            DeliveryError::Connect(e.to_string())
        } else {
            DeliveryError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        let payload = serde_json::json!({
            "subject": message.subject,
            "body": message.body,
        });

        let resp = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status().as_u16()));
        }
        debug!(subject = %message.subject, host = ?self.url.host_str(), "webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Accept one request, hand its raw bytes back, reply with `status`.
    async fn capture_once(status: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if n == 0 || text.trim_end().ends_with('}') {
                    break;
                }
            }
            let resp = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(resp.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
        });
        (addr, rx)
    }

    #[tokio::test]
    async fn posts_json_payload() {
        let (addr, rx) = capture_once("204 No Content").await;
        let notifier = WebhookNotifier::new(&format!("http://{addr}/hook"), Duration::from_secs(2)).unwrap();

        notifier
            .send(&Message::new("ALERT: north", "7 workers down"))
            .await
            .unwrap();

        let raw = rx.await.unwrap();
        assert!(raw.starts_with("POST /hook HTTP/1.1"));
        let body = raw.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["subject"], "ALERT: north");
        assert_eq!(json["body"], "7 workers down");
    }

    #[tokio::test]
    async fn non_2xx_is_failure() {
        let (addr, _rx) = capture_once("500 Internal Server Error").await;
        let notifier = WebhookNotifier::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
        let result = notifier.send(&Message::new("s", "b")).await;
        assert!(matches!(result, Err(DeliveryError::Status(500))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failure() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/", Duration::from_millis(500)).unwrap();
        assert!(notifier.send(&Message::new("s", "b")).await.is_err());
    }

    #[tokio::test]
    async fn https_endpoint_is_attempted() {
        let notifier =
            WebhookNotifier::new("https://127.0.0.1:1/hooks/x", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            notifier.send(&Message::new("s", "b")).await,
            Err(DeliveryError::Connect(_)) | Err(DeliveryError::Timeout(_))
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        for url in ["ftp://hooks.example/x", "hooks.example/x", "mailto:ops@example.com"] {
            assert!(matches!(
                WebhookNotifier::new(url, Duration::from_secs(1)),
                Err(DeliveryError::UnsupportedUrl(_))
            ));
        }
    }

    #[tokio::test]
    async fn credentials_stay_out_of_host_header() {
        let (addr, rx) = capture_once("200 OK").await;
        let notifier = WebhookNotifier::new(
            &format!("http://relay:secret@{addr}/hook"),
            Duration::from_secs(2),
        )
        .unwrap();

        notifier.send(&Message::new("s", "b")).await.unwrap();

        let raw = rx.await.unwrap().to_ascii_lowercase();
        let head = raw.split("\r\n\r\n").next().unwrap();
        assert!(head.contains(&format!("host: {addr}\r\n")));
        assert!(!head.contains("secret@"));
    }
}
