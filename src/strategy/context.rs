use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;

use super::registry::PendingResultRegistry;
use super::types::{ConditionalAlternative, SingleAlternative};
use crate::calendar::sync::CalendarSync;
use crate::common::errors::Result;
use crate::common::retry::RetryPolicy;
use crate::common::traits::{
    CalendarSource, ChartRenderer, NewsStore, TimelineStore, TradeConditionStore,
};
use crate::config::types::{AppConfig, BrandConfig};
use crate::notify::dispatch::Dispatcher;

/// Collaborators shared by the matcher, the engine and the pre-announcement
#[derive(Clone)]
pub struct TradeContext {
    pub source: Arc<dyn CalendarSource>,
    pub news: Arc<dyn NewsStore>,
    pub timelines: Arc<dyn TimelineStore>,
    pub conditions: Arc<dyn TradeConditionStore>,
    pub registry: Arc<PendingResultRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub charts: Arc<dyn ChartRenderer>,
    pub sync: Arc<CalendarSync>,
    pub settings: Arc<TradingSettings>,
}

/// Resolved trading configuration
#[derive(Debug, Clone)]
pub struct TradingSettings {
    pub tz: Tz,
    pub release_poll: RetryPolicy,
    pub dependency_poll: RetryPolicy,
    /// Label → single alternative
    pub alternatives: HashMap<String, SingleAlternative>,
    /// Label → ordered conditional alternatives
    pub conditional_alternatives: HashMap<String, Vec<ConditionalAlternative>>,
    pub site_url: String,
    pub brand: BrandConfig,
    pub pre_announcement_minutes: i64,
    pub cleanup_grace_seconds: i64,
}

impl TradingSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            tz: config.trading.tz()?,
            release_poll: config.engine.release_poll,
            dependency_poll: config.engine.dependency_poll,
            alternatives: config.trading.alternatives.clone(),
            conditional_alternatives: config.trading.conditional_alternatives.clone(),
            site_url: config.source.site_url.clone(),
            brand: config.brand.clone(),
            pre_announcement_minutes: config.trading.pre_announcement_minutes,
            cleanup_grace_seconds: config.trading.cleanup_grace_seconds,
        })
    }
}
