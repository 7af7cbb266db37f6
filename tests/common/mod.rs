//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use news_trader::calendar::messages::CalendarDay;
use news_trader::calendar::sync::CalendarSync;
use news_trader::common::errors::{BotError, Result};
use news_trader::common::traits::{CalendarSource, ChartRenderer, Notifier, TextSink};
use news_trader::common::types::{LiveValue, RawNewsRecord, TimelineEntry};
use news_trader::config::types::{AppConfig, TelegramConfig};
use news_trader::notify::chart::ChartRequest;
use news_trader::notify::dispatch::{DispatchTargets, Dispatcher};
use news_trader::notify::types::{ChannelMessage, Embed, SentMessage};
use news_trader::store::InMemoryStore;
use news_trader::strategy::context::{TradeContext, TradingSettings};
use news_trader::strategy::registry::PendingResultRegistry;
use news_trader::strategy::types::TradeCondition;

pub const ANNOUNCEMENT_CHANNELS: [u64; 2] = [10, 11];
pub const NO_TRADE_CHANNEL: u64 = 20;
pub const NO_TRADE_CHAT: &str = "-100200";

pub fn tz() -> Tz {
    "America/New_York".parse().unwrap()
}

/// Configuration with the test channels and chats
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.discord.announcement_channels = ANNOUNCEMENT_CHANNELS.to_vec();
    config.discord.no_trade_channels = vec![NO_TRADE_CHANNEL];
    config.telegram = Some(TelegramConfig {
        token: "test".to_string(),
        api_url: "http://localhost".to_string(),
        no_trade_chats: vec![NO_TRADE_CHAT.to_string()],
    });
    config
}

// ============================================================================
// Calendar source
// ============================================================================

/// Calendar source answering from in-memory scripts
#[derive(Default)]
pub struct ScriptedSource {
    pub days: Mutex<Vec<CalendarDay>>,
    pub timelines: Mutex<HashMap<i64, Vec<TimelineEntry>>>,
    pub live: Mutex<HashMap<i64, LiveValue>>,
    /// How long a calendar fetch takes
    pub calendar_delay: Mutex<Duration>,
    pub calendar_calls: AtomicUsize,
    pub timeline_calls: AtomicUsize,
    pub live_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn set_days(&self, days: Vec<CalendarDay>) {
        *self.days.lock().unwrap() = days;
    }

    pub fn set_timeline(&self, event_id: i64, entries: Vec<TimelineEntry>) {
        self.timelines.lock().unwrap().insert(event_id, entries);
    }

    pub fn set_live(&self, event_id: i64, value: LiveValue) {
        self.live.lock().unwrap().insert(event_id, value);
    }

    pub fn set_calendar_delay(&self, delay: Duration) {
        *self.calendar_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl CalendarSource for ScriptedSource {
    async fn fetch_calendar(&self, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<CalendarDay>> {
        self.calendar_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.calendar_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.days.lock().unwrap().clone())
    }

    async fn fetch_timeline(&self, event_id: i64) -> Vec<TimelineEntry> {
        self.timeline_calls.fetch_add(1, Ordering::SeqCst);
        self.timelines
            .lock()
            .unwrap()
            .get(&event_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn fetch_live_value(&self, event_id: i64) -> Result<Option<LiveValue>> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live.lock().unwrap().get(&event_id).cloned())
    }
}

// ============================================================================
// Chat fakes
// ============================================================================

/// Discord stand-in recording every call
#[derive(Default)]
pub struct RecordingNotifier {
    pub texts: Mutex<Vec<(u64, String)>>,
    /// (channel, embed, attachment existed when sent)
    pub embeds: Mutex<Vec<(u64, Embed, bool)>>,
    pub history: Mutex<HashMap<u64, Vec<ChannelMessage>>>,
    pub deleted: Mutex<Vec<(u64, String)>>,
    pub failing: Mutex<HashSet<u64>>,
    next_id: AtomicU64,
}

impl RecordingNotifier {
    pub fn fail_channel(&self, channel_id: u64) {
        self.failing.lock().unwrap().insert(channel_id);
    }

    pub fn set_history(&self, channel_id: u64, messages: Vec<ChannelMessage>) {
        self.history.lock().unwrap().insert(channel_id, messages);
    }

    pub fn texts(&self) -> Vec<(u64, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn embeds(&self) -> Vec<(u64, Embed, bool)> {
        self.embeds.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(u64, String)> {
        self.deleted.lock().unwrap().clone()
    }

    fn check(&self, channel_id: u64) -> Result<SentMessage> {
        if self.failing.lock().unwrap().contains(&channel_id) {
            return Err(BotError::Delivery(format!("channel {} is down", channel_id)));
        }
        Ok(SentMessage {
            channel_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<SentMessage> {
        let sent = self.check(channel_id)?;
        self.texts.lock().unwrap().push((channel_id, text.to_string()));
        Ok(sent)
    }

    async fn send_embed(
        &self,
        channel_id: u64,
        embed: &Embed,
        attachment: Option<&Path>,
    ) -> Result<SentMessage> {
        let sent = self.check(channel_id)?;
        let attached = attachment.map(Path::exists).unwrap_or(false);
        self.embeds
            .lock()
            .unwrap()
            .push((channel_id, embed.clone(), attached));
        Ok(sent)
    }

    async fn recent_messages(&self, channel_id: u64, _limit: u32) -> Result<Vec<ChannelMessage>> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(&channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_message(&self, channel_id: u64, message_id: &str) -> Result<()> {
        self.deleted
            .lock()
            .unwrap()
            .push((channel_id, message_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTextSink {
    pub posts: Mutex<Vec<(String, String)>>,
}

impl RecordingTextSink {
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextSink for RecordingTextSink {
    async fn post_text(&self, chat_id: &str, text: &str) -> Result<()> {
        self.posts
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Writes a placeholder file per request into a temp directory
pub struct FakeChart {
    dir: TempDir,
    pub requests: Mutex<Vec<ChartRequest>>,
}

impl FakeChart {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn path_for(&self, file_stem: &str) -> PathBuf {
        self.dir.path().join(format!("{}.png", file_stem))
    }

    pub fn requests(&self) -> Vec<ChartRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChartRenderer for FakeChart {
    fn render(&self, request: &ChartRequest) -> Result<PathBuf> {
        let path = self.path_for(&request.file_stem);
        std::fs::write(&path, b"png")?;
        self.requests.lock().unwrap().push(request.clone());
        Ok(path)
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn condition(event_name: &str, label: &str, currency: &str, bull: &str, eq: &str) -> TradeCondition {
    serde_json::from_value(json!({
        "event_name": event_name,
        "name": label,
        "title": event_name,
        "label": label,
        "currency": currency,
        "country": currency,
        "bull_condition": bull,
        "eq_condition": eq,
        "main_pairs": ["USDJPY"],
        "inverse_pairs": ["EURUSD"],
    }))
    .unwrap()
}

pub fn record(
    event_id: i64,
    event_name: &str,
    currency: &str,
    event_time: DateTime<Utc>,
    forecast: &str,
    ebase_id: i64,
) -> RawNewsRecord {
    RawNewsRecord {
        event_id,
        event_time,
        utc_timestamp: event_time.timestamp(),
        all_day: false,
        country: currency.to_string(),
        currency: currency.to_string(),
        rating: 3,
        event_name: event_name.to_string(),
        actual: String::new(),
        forecast: forecast.to_string(),
        previous: String::new(),
        verdict: json!(0),
        solo_url: String::new(),
        ebase_id,
        has_graph: true,
    }
}

/// Calendar day wire shape holding the given events
pub fn calendar_day(events: Vec<serde_json::Value>) -> CalendarDay {
    serde_json::from_value(json!({ "events": events })).unwrap()
}

pub fn calendar_event(
    id: i64,
    name: &str,
    dateline: i64,
    currency: &str,
    actual: &str,
    ebase_id: i64,
) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "dateline": dateline,
        "timeLabel": "8:30am",
        "country": currency,
        "currency": currency,
        "impactTitle": "High Impact Expected",
        "actual": actual,
        "forecast": "0.3%",
        "previous": "0.4%",
        "actualBetterWorse": 0,
        "soloUrl": "",
        "ebaseId": ebase_id,
        "hasGraph": true,
    })
}

pub fn live(dateline: i64, actual: &str, forecast: &str) -> LiveValue {
    LiveValue {
        dateline,
        actual: actual.to_string(),
        forecast: forecast.to_string(),
        previous: "0.4%".to_string(),
    }
}

/// `count` entries 30 days apart, the newest at `last_dateline`
pub fn history(count: usize, last_dateline: i64) -> Vec<TimelineEntry> {
    (0..count)
        .map(|i| {
            let dateline = last_dateline - (count - 1 - i) as i64 * 30 * 86_400;
            TimelineEntry {
                actual: Some(0.1 * i as f64),
                actual_formatted: Some(format!("{:.1}%", 0.1 * i as f64)),
                date: String::new(),
                dateline,
                forecast: Some(0.2),
                forecast_formatted: Some("0.2%".to_string()),
                id: i as i64,
                is_active: false,
                is_most_recent: false,
                revision: None,
                revision_formatted: None,
            }
        })
        .collect()
}

// ============================================================================
// Harness
// ============================================================================

/// Trade context over in-memory stores and recording fakes
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub source: Arc<ScriptedSource>,
    pub discord: Arc<RecordingNotifier>,
    pub telegram: Arc<RecordingTextSink>,
    pub charts: Arc<FakeChart>,
    pub ctx: TradeContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let source = Arc::new(ScriptedSource::default());
        let discord = Arc::new(RecordingNotifier::default());
        let telegram = Arc::new(RecordingTextSink::default());
        let charts = Arc::new(FakeChart::new());

        let sync = CalendarSync::new(source.clone(), store.clone(), store.clone())
            .with_intervals(Duration::from_secs(5), Duration::ZERO);
        let dispatcher = Dispatcher::new(
            discord.clone(),
            Some(telegram.clone() as Arc<dyn TextSink>),
            DispatchTargets::from_config(&config),
        );

        let ctx = TradeContext {
            source: source.clone(),
            news: store.clone(),
            timelines: store.clone(),
            conditions: store.clone(),
            registry: Arc::new(PendingResultRegistry::new()),
            dispatcher: Arc::new(dispatcher),
            charts: charts.clone(),
            sync: Arc::new(sync),
            settings: Arc::new(TradingSettings::from_config(&config).unwrap()),
        };

        Self {
            store,
            source,
            discord,
            telegram,
            charts,
            ctx,
        }
    }
}
