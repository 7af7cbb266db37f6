//! Announcement and notice text

use chrono_tz::Tz;
use std::time::Duration;

use super::types::{Embed, ANNOUNCEMENT_GREEN};
use crate::common::types::NewsEvent;
use crate::config::types::BrandConfig;
use crate::strategy::types::{BullCondition, Direction, EqCondition, TradeCondition};

/// Flag shown next to the country of a currency
pub fn currency_flag(currency: &str) -> Option<&'static str> {
    let flag = match currency {
        "USD" => "🇺🇸",
        "EUR" => "🇪🇺",
        "GBP" => "🇬🇧",
        "JPY" => "🇯🇵",
        "AUD" => "🇦🇺",
        "NZD" => "🇳🇿",
        "CAD" => "🇨🇦",
        "CHF" => "🇨🇭",
        "CNY" => "🇨🇳",
        _ => return None,
    };
    Some(flag)
}

fn headline(event: &NewsEvent, actual: f64) -> String {
    format!(
        "{} {} {} v {}.",
        event.currency, event.event_name, actual, event.forecast
    )
}

/// Tie with no equal condition, or no conditional branch held
pub fn no_trade_text(event: &NewsEvent, actual: f64) -> String {
    format!(
        "{} No trade triggered as per the parameters set to no trade when result is as expected.",
        headline(event, actual)
    )
}

/// The single alternative moved the other way
pub fn alternative_mismatch_text(event: &NewsEvent, actual: f64, label: &str) -> String {
    format!(
        "{} No trade triggered because the result does not match the alternative {}.",
        headline(event, actual),
        label
    )
}

/// No awaited alternative was recorded in time
pub fn alternative_timeout_text<S: AsRef<str>>(
    event: &NewsEvent,
    actual: f64,
    labels: &[S],
) -> String {
    let labels: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();
    format!(
        "{} No trade triggered because failed to match the alternative condition {}",
        headline(event, actual),
        labels.join(" ")
    )
}

/// Values as the source printed them
#[derive(Debug, Clone, Default)]
pub struct ReleasedValues {
    pub actual: String,
    pub forecast: String,
    pub previous: String,
}

/// Announcement embed for a decided trade
pub fn trade_embed(
    event: &NewsEvent,
    condition: &TradeCondition,
    direction: Direction,
    values: &ReleasedValues,
    took: Duration,
    link: String,
    brand: &BrandConfig,
) -> Embed {
    let flag = currency_flag(&event.currency)
        .map(|f| format!(" {}", f))
        .unwrap_or_default();

    let description = format!(
        "{country}{flag} {name}\n\
         Actual: {actual}\n\
         Forecast: {forecast}\n\
         Previous: {previous}\n\
         Triggered main pairs: {main} ({direction})\n\
         Triggered inverse pairs: {inverse} ({opposite})\n\
         Took: {took:.2} Seconds\n",
        country = event.country,
        flag = flag,
        name = event.event_name,
        actual = values.actual,
        forecast = values.forecast,
        previous = values.previous,
        main = condition.main_pairs.join(", "),
        direction = direction,
        inverse = condition.inverse_pairs.join(", "),
        opposite = direction.opposite(),
        took = took.as_secs_f64(),
    );

    Embed::new(format!("{} {}", event.currency, event.event_name), description)
        .with_url(link)
        .with_footer(&brand.name, brand.icon_url.clone())
}

fn eq_label(eq: EqCondition) -> &'static str {
    match eq {
        EqCondition::Long => "Long",
        EqCondition::Short => "Short",
        EqCondition::None => "None",
    }
}

/// Embed posted ahead of a release, describing what each outcome means
pub fn pre_announcement_embed(
    event: &NewsEvent,
    condition: &TradeCondition,
    lead_minutes: i64,
    less_than: bool,
    tz: &Tz,
    brand: &BrandConfig,
) -> Embed {
    let (below, above) = match condition.bull_condition {
        BullCondition::Below => (Direction::Long, Direction::Short),
        BullCondition::Above => (Direction::Short, Direction::Long),
    };
    let forecast = event.forecast;

    let text = format!(
        "{name} for {time} LIVE in{less} {lead} minutes 📣\n\
         ➡️ Forecast {forecast}  Previous {previous}\n\
         actual < {forecast} is {below} 🚀\n\
         actual > {forecast} is {above} 🐻\n\
         actual = {forecast} is {eq}\n\
         \n\
         Main Pairs: {main}\n\
         Inverse Pairs: {inverse}\n",
        name = event.event_name,
        time = event.event_time.with_timezone(tz).format("%d-%m-%Y %I:%M %p"),
        less = if less_than { " less than" } else { "" },
        lead = lead_minutes,
        forecast = forecast,
        previous = event.previous,
        below = below,
        above = above,
        eq = eq_label(condition.eq_condition),
        main = condition.main_pairs.join(", "),
        inverse = condition.inverse_pairs.join(", "),
    );

    let title = if event.country != event.currency {
        format!("{} - {} - {}", event.event_name, event.currency, event.country)
    } else {
        format!("{} - {}", event.event_name, event.currency)
    };

    Embed::new(title, text)
        .with_color(ANNOUNCEMENT_GREEN)
        .with_timestamp(event.event_time.with_timezone(&chrono::Utc))
        .with_footer(&brand.name, brand.icon_url.clone())
}
