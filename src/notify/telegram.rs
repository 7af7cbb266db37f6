//! Telegram Bot API client, send-only

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

use crate::common::errors::{BotError, Result};
use crate::common::traits::TextSink;
use crate::config::types::TelegramConfig;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Self::with_timeout(&config.api_url, &config.token, Duration::from_secs(30))
    }

    pub fn with_timeout(api_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }
}

#[async_trait]
impl TextSink for TelegramClient {
    #[instrument(skip(self, text))]
    async fn post_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Delivery(format!(
                "Telegram sendMessage returned status {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
