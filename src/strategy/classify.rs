//! Direction classification and the dependency checks built on it

use super::types::{ConditionalAlternative, Direction, TradeCondition};
use super::registry::RecordedResult;

/// Pick a direction for `actual` against `forecast`
///
/// Ties follow the equal condition only; `None` means no trade.
pub fn classify(condition: &TradeCondition, actual: f64, forecast: f64) -> Option<Direction> {
    use super::types::BullCondition;

    if actual == forecast {
        return condition.eq_condition.direction();
    }

    let beat = actual > forecast;
    let long = match condition.bull_condition {
        BullCondition::Above => beat,
        BullCondition::Below => !beat,
    };
    Some(if long { Direction::Long } else { Direction::Short })
}

/// Comparison sign shown next to the forecast
pub fn comparison_sign(actual: f64, forecast: f64) -> &'static str {
    if actual > forecast {
        ">"
    } else if actual < forecast {
        "<"
    } else {
        "="
    }
}

/// Both values on the same side of zero, zero counting as non-negative
pub fn same_sign(a: f64, b: f64) -> bool {
    (a >= 0.0) == (b >= 0.0)
}

/// First conditional branch that holds for this event and its recorded
/// alternative
pub fn first_satisfied_branch<'a, F>(
    branches: &'a [ConditionalAlternative],
    actual: f64,
    forecast: f64,
    mut lookup: F,
) -> Option<&'a ConditionalAlternative>
where
    F: FnMut(&str) -> Option<RecordedResult>,
{
    branches.iter().find(|branch| {
        let Some(recorded) = lookup(&branch.alt.label) else {
            return false;
        };
        branch.condition.holds(actual, forecast)
            && branch.alt.condition.holds(recorded.actual, recorded.forecast)
    })
}
