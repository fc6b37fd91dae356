// =============================================================================
// Telegram Bot API dispatcher
// =============================================================================
//
// SECURITY: the bot token is part of the request path, so URLs are never
// logged and `Debug` redacts the token.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::AlertDispatcher;
use crate::error::ScanError;

const BASE_URL: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends alerts through `sendMessage` of a Telegram bot.
#[derive(Clone)]
pub struct TelegramDispatcher {
    bot_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramDispatcher {
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build Telegram HTTP client")?;

        Ok(Self {
            bot_token: bot_token.into(),
            base_url: BASE_URL.to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }
}

/// Telegram reports failures as `{"ok": false, "error_code": .., "description": ..}`.
fn describe_failure(status: reqwest::StatusCode, body: &serde_json::Value) -> String {
    let description = body["description"].as_str().unwrap_or("no description");
    format!("Telegram sendMessage returned {status}: {description}")
}

#[async_trait]
impl AlertDispatcher for TelegramDispatcher {
    #[instrument(skip(self, text), name = "telegram::send_message")]
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), ScanError> {
        let payload = SendMessage {
            chat_id: channel_id,
            text,
        };

        // Strip the URL from transport errors; it embeds the bot token.
        let resp = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScanError::Notification(e.without_url().to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!(channel_id, "alert delivered");
            return Ok(());
        }

        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        Err(ScanError::Notification(describe_failure(status, &body)))
    }
}

impl std::fmt::Debug for TelegramDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDispatcher")
            .field("bot_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
