//! Delivery to the configured channels
//!
//! Every send is per channel: a failing channel is logged and the next one
//! is still attempted.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::types::{ChannelMessage, Embed, SentMessage};
use crate::common::errors::Result;
use crate::common::traits::{Notifier, TextSink};
use crate::config::types::AppConfig;

/// Plain-text countdown messages removed before a new announcement
const COUNTDOWN_MARKERS: [&str; 2] = ["is LIVE in", "will be released in"];

/// Per-channel delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Where announcements and no-trade notices go
#[derive(Debug, Clone, Default)]
pub struct DispatchTargets {
    pub announcement_channels: Vec<u64>,
    pub no_trade_channels: Vec<u64>,
    pub no_trade_chats: Vec<String>,
    pub history_limit: u32,
    /// Lower-cased label → embed title keyword
    pub categories: HashMap<String, String>,
}

impl DispatchTargets {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            announcement_channels: config.discord.announcement_channels.clone(),
            no_trade_channels: config.discord.no_trade_channels.clone(),
            no_trade_chats: config
                .telegram
                .as_ref()
                .map(|t| t.no_trade_chats.clone())
                .unwrap_or_default(),
            history_limit: config.discord.history_limit,
            categories: config.trading.categories.clone(),
        }
    }
}

/// Whether `message` is a stale announcement to remove before posting for
/// the category `keyword`
pub fn is_stale(message: &ChannelMessage, keyword: Option<&str>) -> bool {
    if !message.content.is_empty() {
        return COUNTDOWN_MARKERS.iter().any(|m| message.content.contains(m));
    }
    match (message.embeds.first(), keyword) {
        (Some(embed), Some(keyword)) => embed.title.to_lowercase().contains(keyword),
        _ => false,
    }
}

/// Sends announcements, no-trade notices and cleans up channel history
pub struct Dispatcher {
    discord: Arc<dyn Notifier>,
    telegram: Option<Arc<dyn TextSink>>,
    targets: DispatchTargets,
}

impl Dispatcher {
    pub fn new(
        discord: Arc<dyn Notifier>,
        telegram: Option<Arc<dyn TextSink>>,
        targets: DispatchTargets,
    ) -> Self {
        Self {
            discord,
            telegram,
            targets,
        }
    }

    pub fn targets(&self) -> &DispatchTargets {
        &self.targets
    }

    /// Announcement channels for a condition, the configured ones when it
    /// names none
    pub fn announcement_channels<'a>(&'a self, own: &'a [u64]) -> &'a [u64] {
        if own.is_empty() {
            &self.targets.announcement_channels
        } else {
            own
        }
    }

    /// Send a no-trade notice to every fallback channel and chat
    pub async fn send_no_trade(&self, text: &str) -> DeliveryReport {
        info!("{}", text);
        let mut report = DeliveryReport::default();

        for &channel_id in &self.targets.no_trade_channels {
            match self.discord.send_text(channel_id, text).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    error!("No-trade notice to {} failed: {}", channel_id, e);
                    report.failed += 1;
                }
            }
        }

        if let Some(telegram) = &self.telegram {
            for chat_id in &self.targets.no_trade_chats {
                match telegram.post_text(chat_id, text).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        error!("No-trade notice to chat {} failed: {}", chat_id, e);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }

    /// Delete countdown texts and same-category embeds from recent history
    pub async fn clear_stale(&self, channel_id: u64, label: &str) -> Result<usize> {
        let keyword = self.targets.categories.get(&label.to_lowercase());
        let history = self
            .discord
            .recent_messages(channel_id, self.targets.history_limit)
            .await?;

        let mut deleted = 0;
        for message in history
            .iter()
            .filter(|m| is_stale(m, keyword.map(String::as_str)))
        {
            match self.discord.delete_message(channel_id, &message.id).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!("Failed to delete {} in {}: {}", message.id, channel_id, e),
            }
        }
        debug!("Deleted {} stale messages in {}", deleted, channel_id);
        Ok(deleted)
    }

    /// Replace stale announcements and post `embed` in each channel
    pub async fn announce(
        &self,
        channels: &[u64],
        embed: &Embed,
        attachment: Option<&Path>,
        label: &str,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for &channel_id in channels {
            if let Err(e) = self.clear_stale(channel_id, label).await {
                warn!("History scan of {} failed: {}", channel_id, e);
            }

            match self.discord.send_embed(channel_id, embed, attachment).await {
                Ok(_) => {
                    info!("{} sent to ({})", embed.title, channel_id);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!("Announcement to {} failed: {}", channel_id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Post `embed` to each channel, keeping handles for later deletion
    pub async fn post(&self, channels: &[u64], embed: &Embed) -> Vec<SentMessage> {
        let mut sent = Vec::with_capacity(channels.len());
        for &channel_id in channels {
            match self.discord.send_embed(channel_id, embed, None).await {
                Ok(message) => sent.push(message),
                Err(e) => error!("Post to {} failed: {}", channel_id, e),
            }
        }
        sent
    }

    /// Delete previously posted messages, logging failures
    pub async fn retract(&self, messages: &[SentMessage]) -> usize {
        let mut deleted = 0;
        for message in messages {
            match self
                .discord
                .delete_message(message.channel_id, &message.message_id)
                .await
            {
                Ok(()) => deleted += 1,
                Err(e) => warn!(
                    "Failed to delete {} in {}: {}",
                    message.message_id, message.channel_id, e
                ),
            }
        }
        deleted
    }
}
