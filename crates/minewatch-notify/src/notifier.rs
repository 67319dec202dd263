//! Notifier trait, message type, and the log-only transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use minewatch_core::{NotifierConfig, NotifierKind};

use crate::command::CommandNotifier;
use crate::webhook::WebhookNotifier;

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("sender failed: {0}")]
    Command(String),

    #[error("invalid notifier config: {0}")]
    Config(String),
}

/// Delivers messages. `Ok(())` means the transport accepted the message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        info!(subject = %message.subject, body = %message.body, "notification");
        Ok(())
    }
}

/// Build the notifier selected by `config`.
pub fn notifier_from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, DeliveryError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let notifier: Arc<dyn Notifier> = match config.kind {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Webhook => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| DeliveryError::Config("webhook notifier requires a url".to_string()))?;
            Arc::new(WebhookNotifier::new(url, timeout)?)
        }
        NotifierKind::Command => Arc::new(CommandNotifier::new(config.command.clone(), timeout)?),
    };
    Ok(notifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_delivers() {
        let msg = Message::new("subject", "body");
        assert!(LogNotifier.send(&msg).await.is_ok());
    }

    #[test]
    fn factory_requires_webhook_url() {
        let config = NotifierConfig {
            kind: NotifierKind::Webhook,
            ..NotifierConfig::default()
        };
        assert!(matches!(notifier_from_config(&config), Err(DeliveryError::Config(_))));
    }

    #[test]
    fn factory_builds_log_by_default() {
        assert!(notifier_from_config(&NotifierConfig::default()).is_ok());
    }
}
