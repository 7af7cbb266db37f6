use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::common::errors::{BotError, Result};

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

/// What beating the forecast means for the main pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BullCondition {
    /// actual > forecast is Long
    Above,
    /// actual < forecast is Long
    Below,
}

/// What to do when actual equals forecast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqCondition {
    Long,
    Short,
    /// No trade; also used for any unrecognized value
    #[default]
    #[serde(other)]
    None,
}

impl EqCondition {
    pub fn direction(self) -> Option<Direction> {
        match self {
            EqCondition::Long => Some(Direction::Long),
            EqCondition::Short => Some(Direction::Short),
            EqCondition::None => None,
        }
    }
}

/// A check of an actual against its forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Fails only when actual < forecast
    Above,
    /// Fails only when actual > forecast
    Below,
}

impl Comparison {
    pub fn holds(self, actual: f64, forecast: f64) -> bool {
        match self {
            Comparison::Above => actual >= forecast,
            Comparison::Below => actual <= forecast,
        }
    }
}

/// How an event reacts to its single alternative being released today
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlternativeMode {
    /// Announce nothing
    Stop,
    /// Announce only if both actuals have the same sign
    #[default]
    #[serde(other)]
    Follow,
}

/// Single dependency on another event, keyed by the dependent's label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleAlternative {
    /// Event name of the alternative, also its registry label
    pub label: String,
    #[serde(default, alias = "condition")]
    pub mode: AlternativeMode,
}

/// The alternative side of a conditional branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeRef {
    pub label: String,
    /// Check on the alternative's recorded actual vs forecast
    pub condition: Comparison,
}

/// One branch of a conditional dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalAlternative {
    /// Check on this event's actual vs forecast
    pub condition: Comparison,
    pub alt: AlternativeRef,
}

/// Trade rule for one tradeable event, keyed by (event name, currency)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCondition {
    /// Event name as it appears in the calendar
    pub event_name: String,
    /// Short display name
    #[serde(default)]
    pub name: String,
    /// Chart title
    #[serde(default)]
    pub title: String,
    /// Category and registry label (e.g. "CPI", "NFP")
    pub label: String,
    pub currency: String,
    pub country: String,
    #[serde(default)]
    pub pips: Vec<f64>,
    #[serde(default = "default_sl_pip")]
    pub sl_pip: f64,
    /// Announcement channels for this event; the configured ones when empty
    #[serde(default, alias = "cid")]
    pub channels: Vec<u64>,
    pub bull_condition: BullCondition,
    #[serde(default)]
    pub eq_condition: EqCondition,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub main_pairs: Vec<String>,
    #[serde(default)]
    pub inverse_pairs: Vec<String>,
    /// Seconds to wait before a Long announcement
    #[serde(default)]
    pub delay_long: f64,
    /// Seconds to wait before a Short announcement
    #[serde(default)]
    pub delay_short: f64,
}

fn default_sl_pip() -> f64 {
    10.0
}

impl TradeCondition {
    /// Reject delays below zero and a non-positive stop loss
    pub fn validate(&self) -> Result<()> {
        if !(self.delay_long >= 0.0 && self.delay_short >= 0.0) {
            return Err(BotError::Validation(format!(
                "{}: delays must be >= 0",
                self.event_name
            )));
        }
        if !(self.sl_pip > 0.0) {
            return Err(BotError::Validation(format!(
                "{}: sl_pip must be > 0",
                self.event_name
            )));
        }
        Ok(())
    }

    /// Delay before announcing a trade in `direction`
    pub fn delay_for(&self, direction: Direction) -> Duration {
        let seconds = match direction {
            Direction::Long => self.delay_long,
            Direction::Short => self.delay_short,
        };
        Duration::from_secs_f64(seconds.max(0.0))
    }

    pub fn is_nfp(&self) -> bool {
        self.label == "NFP"
    }
}

/// Terminal state of one trade decision run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No stored condition or event
    ConditionMissing,
    /// The release poll ran out of attempts
    NotReleased,
    /// Tie with no equal condition, or no conditional branch held
    NoTrade,
    /// The single alternative is released today and says stop
    AlternativeStopped,
    /// The single alternative's actual has the opposite sign
    AlternativeMismatch,
    /// The awaited alternative never showed up in the registry
    AlternativeTimeout,
    /// Announcement sent
    Announced {
        direction: Direction,
        delivered: usize,
    },
}
