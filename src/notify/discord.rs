//! Discord REST client (send, history, delete)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{ChannelMessage, Embed, SentMessage};
use crate::common::errors::{BotError, Result};
use crate::common::traits::Notifier;
use crate::config::types::DiscordConfig;

/// Discord caps history pages at 100 messages
const MAX_HISTORY_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

/// Bot-token client for the Discord channel message endpoints
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    api_url: String,
    token: String,
}

impl DiscordClient {
    /// Create a client from the Discord section; fails without a token
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| BotError::Configuration("discord.token is not set".to_string()))?;
        Self::with_timeout(&config.api_url, &token, Duration::from_secs(30))
    }

    /// Create a client with a custom timeout
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

    fn messages_url(&self, channel_id: u64) -> String {
        format!("{}/channels/{}/messages", self.api_url, channel_id)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Map a non-success response to a delivery failure
    async fn check(response: Response, action: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(BotError::Delivery(format!(
            "Discord {} returned status {}: {}",
            action, status, body
        )))
    }

    async fn sent(response: Response, channel_id: u64) -> Result<SentMessage> {
        let message: MessageId = response.json().await?;
        Ok(SentMessage {
            channel_id,
            message_id: message.id,
        })
    }
}

#[async_trait]
impl Notifier for DiscordClient {
    #[instrument(skip(self, text))]
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<SentMessage> {
        let response = self
            .client
            .post(self.messages_url(channel_id))
            .header(header::AUTHORIZATION, self.auth())
            .json(&json!({ "content": text }))
            .send()
            .await?;

        let response = Self::check(response, "send").await?;
        Self::sent(response, channel_id).await
    }

    #[instrument(skip(self, embed), fields(title = %embed.title))]
    async fn send_embed(
        &self,
        channel_id: u64,
        embed: &Embed,
        attachment: Option<&Path>,
    ) -> Result<SentMessage> {
        let request = self
            .client
            .post(self.messages_url(channel_id))
            .header(header::AUTHORIZATION, self.auth());

        let request = match attachment {
            Some(path) => {
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("chart.png")
                    .to_string();
                let embed = embed.clone().with_attachment_image(&file_name);
                let payload = json!({
                    "embeds": [embed],
                    "attachments": [{ "id": 0, "filename": file_name }],
                });
                let bytes = tokio::fs::read(path).await?;
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("image/png")?;
                let form = Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", part);
                request.multipart(form)
            }
            None => request.json(&json!({ "embeds": [embed] })),
        };

        let response = Self::check(request.send().await?, "send").await?;
        Self::sent(response, channel_id).await
    }

    #[instrument(skip(self))]
    async fn recent_messages(&self, channel_id: u64, limit: u32) -> Result<Vec<ChannelMessage>> {
        let limit = limit.clamp(1, MAX_HISTORY_PAGE).to_string();
        let response = self
            .client
            .get(self.messages_url(channel_id))
            .header(header::AUTHORIZATION, self.auth())
            .query(&[("limit", limit.as_str())])
            .send()
            .await?;

        let response = Self::check(response, "history").await?;
        let messages: Vec<ChannelMessage> = response.json().await?;
        debug!("Fetched {} messages from {}", messages.len(), channel_id);
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, channel_id: u64, message_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.messages_url(channel_id), message_id);
        let response = self
            .client
            .delete(&url)
            .header(header::AUTHORIZATION, self.auth())
            .send()
            .await?;

        Self::check(response, "delete").await?;
        Ok(())
    }
}
