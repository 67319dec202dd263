//! Command transport: pipes the message body to a local sender.
//!
//! Suits `sendmail`-style tools. `{subject}` in the argv is replaced with
//! the message subject; the body is written to stdin.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::notifier::{DeliveryError, Message, Notifier};

pub struct CommandNotifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        if argv.is_empty() {
            return Err(DeliveryError::Config(
                "command notifier requires a command".to_string(),
            ));
        }
        Ok(Self { argv, timeout })
    }

    async fn run(&self, message: &Message) -> Result<(), DeliveryError> {
        let program = &self.argv[0];
        let args: Vec<String> = self.argv[1..]
            .iter()
            .map(|a| a.replace("{subject}", &message.subject))
            .collect();

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeliveryError::Command(format!("{program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.body.as_bytes())
                .await
                .map_err(|e| DeliveryError::Command(format!("{program}: {e}")))?;
            // Dropping stdin closes the pipe so the sender sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DeliveryError::Command(format!("{program}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(%program, %stderr, "sender exited with failure");
            return Err(DeliveryError::Command(format!(
                "{program} exited with {}",
                output.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.timeout, self.run(message))
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: String) -> CommandNotifier {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            script,
            "sender".to_string(),
            "{subject}".to_string(),
        ];
        CommandNotifier::new(argv, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn writes_subject_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mail.txt");
        let notifier = sh(format!("{{ echo \"$1\"; cat; }} > {}", out.display()));

        notifier
            .send(&Message::new("RECOVERY: north", "all back"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "RECOVERY: north\nall back");
    }

    #[tokio::test]
    async fn failing_sender_is_delivery_error() {
        let notifier = sh("cat > /dev/null; exit 1".to_string());
        assert!(matches!(
            notifier.send(&Message::new("s", "b")).await,
            Err(DeliveryError::Command(_))
        ));
    }

    #[tokio::test]
    async fn hung_sender_times_out() {
        let argv = vec!["sleep".to_string(), "5".to_string()];
        let notifier = CommandNotifier::new(argv, Duration::from_millis(100)).unwrap();
        assert!(matches!(
            notifier.send(&Message::new("s", "b")).await,
            Err(DeliveryError::Timeout(_)) | Err(DeliveryError::Command(_))
        ));
    }
}
