//! Outbound email.
//!
//! Sends go through a Resend-compatible HTTP API. Delivery is fire-and-forget:
//! callers hand a message to [`dispatch`] and never wait on the result.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::notifications::{EmailMessage, NotificationType};

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// HTTP email API client
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(api_url = api_url, "Email client initialized");

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSender for EmailClient {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Email API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Email API returned {}: {}", status, detail);
        }

        debug!(to = %message.to, "Email accepted by API");
        Ok(())
    }
}

/// Sender used when no email API key is configured
#[derive(Clone, Default)]
pub struct LogOnlySender;

#[async_trait]
impl NotificationSender for LogOnlySender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email API not configured, message logged only"
        );
        Ok(())
    }
}

/// Send `message` on a detached task. Failures are logged, never retried.
pub fn dispatch(
    sender: Arc<dyn NotificationSender>,
    kind: NotificationType,
    message: EmailMessage,
) {
    tokio::spawn(async move {
        match sender.send(&message).await {
            Ok(()) => info!(notification_type = %kind, to = %message.to, "Notification sent"),
            Err(e) => warn!(
                notification_type = %kind,
                to = %message.to,
                error = %e,
                "Notification failed"
            ),
        }
    });
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSender;
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn dispatch_sends_in_background() {
        let sender = RecordingSender::default();
        dispatch(
            Arc::new(sender.clone()),
            NotificationType::Custom,
            EmailMessage::new("dana@example.com", "Hi", "<p>Hello</p>"),
        );
        settle().await;
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_is_not_retried() {
        let sender = RecordingSender::failing();
        dispatch(
            Arc::new(sender.clone()),
            NotificationType::Custom,
            EmailMessage::new("dana@example.com", "Hi", "<p>Hello</p>"),
        );
        settle().await;
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn log_only_sender_always_succeeds() {
        let msg = EmailMessage::new("dana@example.com", "Hi", "<p>Hello</p>");
        assert!(LogOnlySender.send(&msg).await.is_ok());
    }
}
