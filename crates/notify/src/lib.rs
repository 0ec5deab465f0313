//! Delivers markdown-bodied alerts and reports to webhook sinks. Transport
//! failures never propagate to the caller — they are logged to the ring
//! and the message is dropped.

use std::sync::Arc;

use hostwatch_logring::LogRing;
use serde_json::json;

#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

/// Dispatches one message to whichever sinks are configured. Does not
/// redact: redaction is the caller's responsibility before the body is
/// built.
pub struct Notifier {
    client: reqwest::Client,
    config: NotifierConfig,
    ring: Arc<LogRing>,
}

impl Notifier {
    pub fn new(config: NotifierConfig, ring: Arc<LogRing>) -> Self {
        Self { client: reqwest::Client::new(), config, ring }
    }

    /// Sends `title`/`body` to every configured sink. Returns the number
    /// of sinks that accepted the message (0 if none are configured).
    pub async fn send(&self, title: &str, body: &str) -> usize {
        let mut delivered = 0;

        if let Some(url) = self.config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            tracing::debug!(title, "notifier: posting webhook alert");
            match self.post_webhook(url, title, body).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(%err, "notifier: webhook POST failed");
                    self.ring.append(format!("notifier: webhook POST failed: {err}"));
                }
            }
        }

        if let (Some(token), Some(chat_id)) = (
            self.config.telegram_token.as_deref().filter(|t| !t.is_empty()),
            self.config.telegram_chat_id.as_deref().filter(|c| !c.is_empty()),
        ) {
            tracing::debug!(title, "notifier: posting telegram alert");
            match self.post_telegram(token, chat_id, body).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(%err, "notifier: telegram POST failed");
                    self.ring.append(format!("notifier: telegram POST failed: {err}"));
                }
            }
        }

        if delivered == 0 {
            tracing::debug!("notifier: no sinks configured, message dropped");
            self.ring.append("notifier: no sinks configured, message dropped");
        }

        delivered
    }

    async fn post_webhook(&self, url: &str, title: &str, body: &str) -> Result<(), reqwest::Error> {
        let envelope = json!({
            "msgtype": "markdown",
            "markdown": { "title": title, "text": body },
        });
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&envelope)
            .send()
            .await?;
        let _ = response.text().await;
        Ok(())
    }

    async fn post_telegram(&self, token: &str, chat_id: &str, body: &str) -> Result<(), reqwest::Error> {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let payload = json!({
            "chat_id": chat_id,
            "text": body,
            "parse_mode": "Markdown",
        });
        let response = self.client.post(&url).json(&payload).send().await?;
        let _ = response.text().await;
        Ok(())
    }
}
