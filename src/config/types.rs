//! Configuration types

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::errors::{BotError, Result};
use crate::common::retry::RetryPolicy;
use crate::strategy::types::{ConditionalAlternative, SingleAlternative};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Calendar site endpoints
    #[serde(default)]
    pub source: SourceConfig,
    /// Database configuration (in-memory stores when absent)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Discord bot configuration
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Telegram bot configuration (optional no-trade fallback)
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    /// Trade rule wiring between events
    #[serde(default)]
    pub trading: TradingConfig,
    /// Polling limits for the trade decision engine
    #[serde(default)]
    pub engine: EngineConfig,
    /// Chart rendering
    #[serde(default)]
    pub chart: ChartConfig,
    /// Footer branding on every embed
    #[serde(default)]
    pub brand: BrandConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Calendar site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Settings endpoint returning the calendar window
    #[serde(default = "default_calendar_url")]
    pub calendar_url: String,
    /// Per-event historical graph endpoint
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    /// Per-event live JSON endpoint
    #[serde(default = "default_event_url")]
    pub event_url: String,
    /// Public calendar page used for detail links
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Browser user agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            calendar_url: default_calendar_url(),
            graph_url: default_graph_url(),
            event_url: default_event_url(),
            site_url: default_site_url(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_calendar_url() -> String {
    "https://www.forexfactory.com/calendar/apply-settings/1?navigation=0".to_string()
}

fn default_graph_url() -> String {
    "https://www.forexfactory.com/calendar/graph".to_string()
}

fn default_event_url() -> String {
    "https://faireconomy.media/calendar".to_string()
}

fn default_site_url() -> String {
    "https://www.forexfactory.com/calendar".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Mobile Safari/537.36"
        .to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration for the news, timeline and condition stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// Discord bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token
    #[serde(default)]
    pub token: Option<String>,
    /// REST API base URL
    #[serde(default = "default_discord_api_url")]
    pub api_url: String,
    /// Channels receiving announcements and pre-announcements
    #[serde(default)]
    pub announcement_channels: Vec<u64>,
    /// Channels receiving "no trade" notices
    #[serde(default)]
    pub no_trade_channels: Vec<u64>,
    /// How many recent messages to scan for stale announcements
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_discord_api_url(),
            announcement_channels: Vec::new(),
            no_trade_channels: Vec::new(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_discord_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_history_limit() -> u32 {
    100
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    pub token: String,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    /// Chats receiving "no trade" notices
    #[serde(default)]
    pub no_trade_chats: Vec<String>,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Trade rule wiring between events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Display timezone (IANA name)
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Run the engine right away for matches whose release already passed
    #[serde(default)]
    pub send_previous: bool,
    /// Lead time of the pre-announcement
    #[serde(default = "default_pre_announcement_minutes")]
    pub pre_announcement_minutes: i64,
    /// How long after release the pre-announcement is deleted
    #[serde(default = "default_cleanup_grace_seconds")]
    pub cleanup_grace_seconds: i64,
    /// Label → single alternative dependency
    #[serde(default)]
    pub alternatives: HashMap<String, SingleAlternative>,
    /// Label → ordered conditional alternatives
    #[serde(default)]
    pub conditional_alternatives: HashMap<String, Vec<ConditionalAlternative>>,
    /// Lower-cased label → embed title keyword of its stale announcements
    #[serde(default = "default_categories")]
    pub categories: HashMap<String, String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            send_previous: false,
            pre_announcement_minutes: default_pre_announcement_minutes(),
            cleanup_grace_seconds: default_cleanup_grace_seconds(),
            alternatives: HashMap::new(),
            conditional_alternatives: HashMap::new(),
            categories: default_categories(),
        }
    }
}

impl TradingConfig {
    /// Parsed display timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| BotError::Configuration(format!("timezone {}: {}", self.timezone, e)))
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_pre_announcement_minutes() -> i64 {
    15
}

fn default_cleanup_grace_seconds() -> i64 {
    120
}

fn default_categories() -> HashMap<String, String> {
    [
        ("cpi", "consumer price index calendar"),
        ("nfp", "non farm payrolls"),
        ("ppi", "producer price index"),
        ("feduk", "u.k federal funds rate"),
        ("fedus", "u.s federal funds rate"),
    ]
    .into_iter()
    .map(|(label, keyword)| (label.to_string(), keyword.to_string()))
    .collect()
}

/// Polling limits for the trade decision engine and the sync lock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Waiting for the source to publish the actual value
    #[serde(default)]
    pub release_poll: RetryPolicy,
    /// Waiting for a dependency's result in the registry
    #[serde(default = "default_dependency_poll")]
    pub dependency_poll: RetryPolicy,
    /// Poll interval while a fast sync waits for a running sync
    #[serde(default = "default_sync_wait_ms")]
    pub sync_wait_ms: u64,
    /// Pause after each stored timeline during backfill
    #[serde(default = "default_timeline_pause_ms")]
    pub timeline_pause_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            release_poll: RetryPolicy::default(),
            dependency_poll: default_dependency_poll(),
            sync_wait_ms: default_sync_wait_ms(),
            timeline_pause_ms: default_timeline_pause_ms(),
        }
    }
}

fn default_dependency_poll() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1000,
        interval_ms: 2000,
        error_backoff_ms: 2000,
    }
}

fn default_sync_wait_ms() -> u64 {
    5000
}

fn default_timeline_pause_ms() -> u64 {
    500
}

/// Chart rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Directory for rendered chart images
    #[serde(default = "default_chart_dir")]
    pub output_dir: String,
    /// Brand logo pasted in the top-right corner
    #[serde(default)]
    pub logo_path: Option<String>,
    /// TrueType font used for titles and labels
    #[serde(default = "default_font_path")]
    pub font_path: Option<String>,
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: default_chart_dir(),
            logo_path: None,
            font_path: default_font_path(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

fn default_chart_dir() -> String {
    "charts".to_string()
}

fn default_font_path() -> Option<String> {
    Some("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string())
}

fn default_chart_width() -> u32 {
    640
}

fn default_chart_height() -> u32 {
    480
}

/// Footer branding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    #[serde(default = "default_brand_name")]
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            icon_url: None,
        }
    }
}

fn default_brand_name() -> String {
    "Dynamo Trader".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Minutes between full calendar syncs
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            sync_interval_minutes: default_sync_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sync_interval() -> u64 {
    60
}
