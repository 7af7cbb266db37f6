//! Normalizer: raw scraped documents into validated [`NewsEvent`]s

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use super::errors::BotError;
use super::types::NewsEvent;

/// Typed parse failure for a single record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("rating {0} outside 0..=3")]
    RatingOutOfRange(i64),
}

impl From<NormalizeError> for BotError {
    fn from(err: NormalizeError) -> Self {
        BotError::Validation(err.to_string())
    }
}

/// Loosely typed scalar as found in schema-less documents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    #[default]
    Null,
}

#[derive(Debug, Deserialize)]
struct LooseRecord {
    event_id: Loose,
    event_time: Loose,
    #[serde(default)]
    all_day: bool,
    currency: String,
    #[serde(default)]
    country: Option<String>,
    rating: i64,
    event_name: String,
    #[serde(default)]
    actual: Loose,
    #[serde(default)]
    forecast: Loose,
    #[serde(default)]
    previous: Loose,
    #[serde(default)]
    verdict: Loose,
    #[serde(rename = "soloUrl", default)]
    solo_url: String,
    ebase_id: i64,
    #[serde(rename = "hasGraph", default)]
    has_graph: bool,
}

/// Strip number decoration and parse as `f64`
///
/// Commas, `%`, magnitude suffixes (`k`, `m`, `b`, `t` in either case),
/// angle brackets and control characters are removed. An empty string is 0.
pub fn parse_numeric(raw: &str) -> Result<f64, NormalizeError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| {
            !c.is_control()
                && !matches!(
                    c.to_ascii_lowercase(),
                    ',' | '%' | 'k' | 'm' | 'b' | 't' | '<' | '>'
                )
        })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Ok(0.0);
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NormalizeError::InvalidNumber {
            field: "value",
            value: raw.to_string(),
        })
}

/// Like [`parse_numeric`] but `None` for an empty string
pub fn parse_optional_numeric(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        return None;
    }
    parse_numeric(raw).ok()
}

/// Rewrite standalone period abbreviations like `m/m` into `(MoM)`
pub fn expand_period_abbreviations(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let is_word = |c: Option<&char>| c.map(|c| c.is_alphanumeric() || *c == '_').unwrap_or(false);

    let mut i = 0;
    while i < chars.len() {
        let matches_pattern = i + 2 < chars.len()
            && chars[i].is_alphanumeric()
            && chars[i + 1] == '/'
            && chars[i + 2].is_alphanumeric()
            && !is_word(if i == 0 { None } else { chars.get(i - 1) })
            && !is_word(chars.get(i + 3));

        if matches_pattern {
            let letter = chars[i].to_uppercase().collect::<String>();
            out.push_str(&format!("({}o{})", letter, letter));
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn loose_number(value: &Loose, field: &'static str) -> Result<f64, NormalizeError> {
    match value {
        Loose::Int(v) => Ok(*v as f64),
        Loose::Float(v) => Ok(*v),
        Loose::Text(s) => parse_numeric(s).map_err(|_| NormalizeError::InvalidNumber {
            field,
            value: s.clone(),
        }),
        Loose::Null => Ok(0.0),
        Loose::Bool(b) => Err(NormalizeError::InvalidNumber {
            field,
            value: b.to_string(),
        }),
    }
}

fn loose_id(value: &Loose) -> Result<i64, NormalizeError> {
    match value {
        Loose::Int(v) => Ok(*v),
        Loose::Text(s) => s.trim().parse().map_err(|_| NormalizeError::InvalidNumber {
            field: "event_id",
            value: s.clone(),
        }),
        other => Err(NormalizeError::Malformed(format!("event_id: {:?}", other))),
    }
}

/// Parse a timestamp; naive values are taken as UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, NormalizeError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(NormalizeError::InvalidTimestamp(value.to_string()))
}

fn loose_time(value: &Loose) -> Result<DateTime<Utc>, NormalizeError> {
    match value {
        Loose::Int(secs) => Utc
            .timestamp_opt(*secs, 0)
            .single()
            .ok_or_else(|| NormalizeError::InvalidTimestamp(secs.to_string())),
        Loose::Text(s) => parse_timestamp(s),
        other => Err(NormalizeError::InvalidTimestamp(format!("{:?}", other))),
    }
}

/// Validate one raw document into a [`NewsEvent`] in the display timezone
pub fn normalize_event(doc: &serde_json::Value, tz: &Tz) -> Result<NewsEvent, NormalizeError> {
    let record =
        LooseRecord::deserialize(doc).map_err(|e| NormalizeError::Malformed(e.to_string()))?;

    if !(0..=3).contains(&record.rating) {
        return Err(NormalizeError::RatingOutOfRange(record.rating));
    }

    let verdict = match &record.verdict {
        Loose::Null => 0,
        other => loose_number(other, "verdict")? as i64,
    };

    Ok(NewsEvent {
        event_id: loose_id(&record.event_id)?,
        event_time: loose_time(&record.event_time)?.with_timezone(tz),
        all_day: record.all_day,
        currency: record.currency,
        country: record.country.unwrap_or_default(),
        rating: record.rating as u8,
        event_name: record.event_name,
        actual: loose_number(&record.actual, "actual")?,
        forecast: loose_number(&record.forecast, "forecast")?,
        previous: loose_number(&record.previous, "previous")?,
        verdict,
        solo_url: record.solo_url,
        ebase_id: record.ebase_id,
        has_graph: record.has_graph,
    })
}

/// Normalize a batch, logging and dropping records that fail validation
pub fn normalize_all<I>(docs: I, tz: &Tz) -> Vec<NewsEvent>
where
    I: IntoIterator<Item = serde_json::Value>,
{
    docs.into_iter()
        .filter_map(|doc| match normalize_event(&doc, tz) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Dropping calendar record: {} ({})", e, doc);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn raw_doc() -> serde_json::Value {
        json!({
            "event_id": 135981,
            "event_time": "2024-04-05T12:30:00Z",
            "utc_timestamp": 1712320200,
            "all_day": false,
            "country": "US",
            "currency": "USD",
            "rating": 3,
            "event_name": "Non-Farm Employment Change",
            "actual": "303K",
            "forecast": "212K",
            "previous": "",
            "verdict": 1,
            "soloUrl": "/calendar/135981",
            "ebase_id": 42,
            "hasGraph": true
        })
    }

    #[test]
    fn test_parse_numeric_decorations() {
        assert_eq!(parse_numeric("303K").unwrap(), 303.0);
        assert_eq!(parse_numeric("303k").unwrap(), 303.0);
        assert_eq!(parse_numeric("1.2%").unwrap(), 1.2);
        assert_eq!(parse_numeric("").unwrap(), 0.0);
        assert_eq!(parse_numeric("-5m").unwrap(), -5.0);
        assert_eq!(parse_numeric("-5M").unwrap(), -5.0);
        assert_eq!(parse_numeric("1,234.5B").unwrap(), 1234.5);
        assert_eq!(parse_numeric("<0.1T").unwrap(), 0.1);
        assert_eq!(parse_numeric("2.5\u{8}").unwrap(), 2.5);
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        assert!(parse_numeric("n/a").is_err());
        assert_eq!(parse_optional_numeric(""), None);
        assert_eq!(parse_optional_numeric("4.5%"), Some(4.5));
    }

    #[test]
    fn test_expand_period_abbreviations() {
        assert_eq!(expand_period_abbreviations("CPI m/m"), "CPI (MoM)");
        assert_eq!(expand_period_abbreviations("Core PPI y/y"), "Core PPI (YoY)");
        assert_eq!(expand_period_abbreviations("GDP q/q Final"), "GDP (QoQ) Final");
        assert_eq!(expand_period_abbreviations("Non-Farm Payrolls"), "Non-Farm Payrolls");
        assert_eq!(expand_period_abbreviations("abc/def"), "abc/def");
    }

    #[test]
    fn test_normalize_event() {
        let event = normalize_event(&raw_doc(), &tz()).unwrap();
        assert_eq!(event.event_id, 135981);
        assert_eq!(event.actual, 303.0);
        assert_eq!(event.forecast, 212.0);
        assert_eq!(event.previous, 0.0);
        assert_eq!(event.event_time.format("%H:%M").to_string(), "08:30");
        assert_eq!(event.rating, 3);
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let mut doc = raw_doc();
        doc["event_time"] = json!("2024-04-05T12:30:00");
        let event = normalize_event(&doc, &tz()).unwrap();
        assert_eq!(event.release_timestamp(), 1712320200);
    }

    #[test]
    fn test_string_event_id() {
        let mut doc = raw_doc();
        doc["event_id"] = json!("135981");
        assert_eq!(normalize_event(&doc, &tz()).unwrap().event_id, 135981);
    }

    #[test]
    fn test_rating_out_of_range() {
        let mut doc = raw_doc();
        doc["rating"] = json!(4);
        assert_eq!(
            normalize_event(&doc, &tz()),
            Err(NormalizeError::RatingOutOfRange(4))
        );
    }

    #[test]
    fn test_normalize_all_drops_invalid() {
        let mut bad = raw_doc();
        bad["actual"] = json!("pending");
        let mut missing = raw_doc();
        missing.as_object_mut().unwrap().remove("currency");

        let events = normalize_all(vec![raw_doc(), bad, missing], &tz());
        assert_eq!(events.len(), 1);
    }
}
