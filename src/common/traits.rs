//! Trait definitions for the external collaborators
//!
//! The engine, the sync and the matcher only talk to the calendar site, the
//! document store and the chat platforms through these traits, so each can
//! be swapped for an in-memory or mocked implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

use super::errors::Result;
use super::types::{LiveValue, RawNewsRecord, Timeline, TimelineEntry, TimelineKey};
use crate::calendar::messages::CalendarDay;
use crate::notify::chart::ChartRequest;
use crate::notify::types::{ChannelMessage, Embed, SentMessage};
use crate::strategy::types::TradeCondition;

/// Read access to the economic calendar site
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Fetch every calendar day between `start` and `end` (inclusive)
    async fn fetch_calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>>;

    /// Historical releases of an event, oldest first
    ///
    /// Failures are logged and yield an empty list.
    async fn fetch_timeline(&self, event_id: i64) -> Vec<TimelineEntry>;

    /// Current value of a single event
    ///
    /// `Ok(None)` when the endpoint answers with a non-success status.
    async fn fetch_live_value(&self, event_id: i64) -> Result<Option<LiveValue>>;
}

/// News events keyed by source identifier
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Insert or replace every record by `event_id`
    async fn upsert_events(&self, records: &[RawNewsRecord]) -> Result<usize>;

    /// Raw documents with `start <= event_time < end`, oldest first
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<serde_json::Value>>;

    /// Raw document for one event
    async fn event_document(&self, event_id: i64) -> Result<Option<serde_json::Value>>;

    /// Number of stored events
    async fn count_events(&self) -> Result<usize>;
}

/// Historical timelines keyed by (event name, currency, ebase id)
#[async_trait]
pub trait TimelineStore: Send + Sync {
    async fn upsert_timeline(&self, timeline: &Timeline) -> Result<()>;

    async fn timeline(&self, key: &TimelineKey) -> Result<Option<Timeline>>;
}

/// Read-mostly trade rule reference data keyed by (event name, currency)
#[async_trait]
pub trait TradeConditionStore: Send + Sync {
    /// Every configured condition, ordered by currency
    async fn all_conditions(&self) -> Result<Vec<TradeCondition>>;

    async fn find_condition(&self, event_name: &str, currency: &str)
        -> Result<Option<TradeCondition>>;

    /// Seed or replace a condition
    async fn upsert_condition(&self, condition: &TradeCondition) -> Result<()>;
}

/// Channel-based chat platform with history and deletion
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<SentMessage>;

    /// Send an embed, optionally attaching an image referenced by the embed
    async fn send_embed(
        &self,
        channel_id: u64,
        embed: &Embed,
        attachment: Option<&Path>,
    ) -> Result<SentMessage>;

    /// Most recent messages, newest first
    async fn recent_messages(&self, channel_id: u64, limit: u32) -> Result<Vec<ChannelMessage>>;

    async fn delete_message(&self, channel_id: u64, message_id: &str) -> Result<()>;
}

/// Send-only text chat (used for the no-trade fallback)
#[async_trait]
pub trait TextSink: Send + Sync {
    async fn post_text(&self, chat_id: &str, text: &str) -> Result<()>;
}

/// Draws a chart image and returns the written file
pub trait ChartRenderer: Send + Sync {
    fn render(&self, request: &ChartRequest) -> Result<PathBuf>;
}
