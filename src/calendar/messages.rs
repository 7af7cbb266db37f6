//! Calendar site wire formats

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::normalize::expand_period_abbreviations;
use crate::common::types::{RawNewsRecord, TimelineEntry};

/// Accept a string, a number or null as a string field
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Body of the "apply settings" POST that returns the calendar window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarSettingsRequest {
    pub default_view: String,
    pub impacts: Vec<u8>,
    pub event_types: Vec<u8>,
    pub currencies: Vec<u8>,
    /// "Month DD, YYYY"
    pub begin_date: String,
    /// "Month DD, YYYY"
    pub end_date: String,
}

impl CalendarSettingsRequest {
    /// Request every impact level, event type and currency in the range
    pub fn for_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            default_view: "today".to_string(),
            impacts: vec![3, 2, 1],
            event_types: vec![1, 2, 3, 4, 5, 7, 8, 9, 10, 11],
            currencies: (1..=9).collect(),
            begin_date: start.format("%B %d, %Y").to_string(),
            end_date: end.format("%B %d, %Y").to_string(),
        }
    }
}

/// Calendar window response
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarResponse {
    #[serde(default)]
    pub days: Vec<CalendarDay>,
}

/// One calendar day
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarDay {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
}

/// One scraped event, as the site reports it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub name: String,
    /// Release time, unix seconds UTC
    pub dateline: i64,
    #[serde(rename = "timeLabel", default, deserialize_with = "lenient_string")]
    pub time_label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(rename = "impactTitle", default, deserialize_with = "lenient_string")]
    pub impact_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub actual: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub forecast: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub previous: String,
    #[serde(rename = "actualBetterWorse", default)]
    pub actual_better_worse: serde_json::Value,
    #[serde(rename = "soloUrl", default, deserialize_with = "lenient_string")]
    pub solo_url: String,
    #[serde(rename = "ebaseId")]
    pub ebase_id: i64,
    #[serde(rename = "hasGraph", default)]
    pub has_graph: bool,
}

impl CalendarEvent {
    /// Importance from the textual impact ("High" 3, "Medium" 2, else 1)
    pub fn rating(&self) -> u8 {
        if self.impact_title.contains("High") {
            3
        } else if self.impact_title.contains("Medium") {
            2
        } else {
            1
        }
    }

    pub fn is_all_day(&self) -> bool {
        self.time_label == "All Day"
    }

    /// Convert into the stored document shape
    pub fn into_record(self) -> RawNewsRecord {
        let event_time = Utc
            .timestamp_opt(self.dateline, 0)
            .single()
            .unwrap_or_default();

        RawNewsRecord {
            event_id: self.id,
            event_time,
            utc_timestamp: self.dateline,
            all_day: self.is_all_day(),
            rating: self.rating(),
            event_name: expand_period_abbreviations(&self.name),
            country: self.country,
            currency: self.currency,
            actual: self.actual,
            forecast: self.forecast,
            previous: self.previous,
            verdict: self.actual_better_worse,
            solo_url: self.solo_url,
            ebase_id: self.ebase_id,
            has_graph: self.has_graph,
        }
    }
}

/// Graph endpoint response: `{data: {events: [...]}}`
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    pub data: TimelineData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineData {
    #[serde(default)]
    pub events: Vec<TimelineEntry>,
}
