//! Unified types shared by the scraper, the stores and the trade engine

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::messages::lenient_string;

/// A validated calendar event
///
/// Produced by the normalizer from a stored or freshly scraped document.
/// Numeric fields are always populated (an empty source string becomes 0).
#[derive(Debug, Clone, PartialEq)]
pub struct NewsEvent {
    /// Source identifier of this release
    pub event_id: i64,
    /// Scheduled release time in the display timezone
    pub event_time: DateTime<Tz>,
    /// Whether the source lists the event as "All Day"
    pub all_day: bool,
    pub currency: String,
    pub country: String,
    /// Importance, 0 (none) to 3 (high)
    pub rating: u8,
    pub event_name: String,
    pub actual: f64,
    pub forecast: f64,
    pub previous: f64,
    /// Source "better/worse" verdict flag
    pub verdict: i64,
    pub solo_url: String,
    /// Lineage id shared by every release of the same indicator
    pub ebase_id: i64,
    pub has_graph: bool,
}

impl NewsEvent {
    /// Release time as unix seconds
    pub fn release_timestamp(&self) -> i64 {
        self.event_time.timestamp()
    }

    /// Whether the release time is strictly before `now`
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.event_time.with_timezone(&Utc) < now
    }

    /// Link to the event's detail panel on the calendar site
    pub fn detail_link(&self, site_url: &str) -> String {
        format!(
            "{}?day={}#detail={}",
            site_url.trim_end_matches('/'),
            self.event_time.format("%b%d.%Y"),
            self.event_id
        )
    }
}

/// Document shape written to the news store by the calendar sync
///
/// Values are kept exactly as scraped; the normalizer coerces them on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNewsRecord {
    pub event_id: i64,
    pub event_time: DateTime<Utc>,
    pub utc_timestamp: i64,
    pub all_day: bool,
    pub country: String,
    pub currency: String,
    pub rating: u8,
    pub event_name: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
    pub verdict: serde_json::Value,
    #[serde(rename = "soloUrl")]
    pub solo_url: String,
    pub ebase_id: i64,
    #[serde(rename = "hasGraph")]
    pub has_graph: bool,
}

/// One historical release in an event timeline
///
/// Mirrors the source graph endpoint's entry format so stored timelines can
/// be compared with freshly fetched ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub actual: Option<f64>,
    #[serde(default)]
    pub actual_formatted: Option<String>,
    /// Month label, e.g. "Apr 2024"
    #[serde(default)]
    pub date: String,
    /// Release time as unix seconds (UTC)
    pub dateline: i64,
    #[serde(default)]
    pub forecast: Option<f64>,
    #[serde(default)]
    pub forecast_formatted: Option<String>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_most_recent: bool,
    #[serde(default)]
    pub revision: Option<f64>,
    #[serde(default)]
    pub revision_formatted: Option<String>,
}

impl TimelineEntry {
    /// Release time in the given timezone
    pub fn release_time(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        Utc.timestamp_opt(self.dateline, 0)
            .single()
            .map(|t| t.with_timezone(tz))
    }
}

/// Identity of one event lineage in the timeline store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimelineKey {
    pub event_name: String,
    pub currency: String,
    pub ebase_id: i64,
}

impl TimelineKey {
    pub fn new(event_name: impl Into<String>, currency: impl Into<String>, ebase_id: i64) -> Self {
        Self {
            event_name: event_name.into(),
            currency: currency.into(),
            ebase_id,
        }
    }

    pub fn for_event(event: &NewsEvent) -> Self {
        Self::new(&event.event_name, &event.currency, event.ebase_id)
    }
}

/// A stored timeline with the release id it was last refreshed from
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub key: TimelineKey,
    pub event_id: i64,
    pub entries: Vec<TimelineEntry>,
}

/// Latest value of a single event as reported by the live endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveValue {
    /// Release time as unix seconds (UTC)
    #[serde(default)]
    pub dateline: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub actual: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub forecast: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub previous: String,
}

impl LiveValue {
    /// True once the source reports a newer release with an actual value
    pub fn is_released_after(&self, last_dateline: i64) -> bool {
        self.dateline > last_dateline && !self.actual.trim().is_empty()
    }
}
