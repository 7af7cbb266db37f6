//! Trade decision engine
//!
//! One run per released tradeable event:
//!
//! ```text
//! reload condition + stored event
//!        │
//!        ▼
//! poll live value until released ──(exhausted)──▶ NotReleased
//!        │
//!        ▼
//! classify ──▶ record {actual, forecast} in the registry
//!        │
//!        ├──(no direction)──▶ no-trade notice ──▶ NoTrade
//!        ▼
//! single alternative │ conditional alternatives │ none
//!        │
//!        ▼
//! merge release into timeline ──▶ chart + embed ──▶ announce
//! ```

use chrono::{TimeZone, Utc};
use std::collections::BTreeSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::classify::{classify, comparison_sign, first_satisfied_branch, same_sign};
use super::context::TradeContext;
use super::matcher::today_window;
use super::registry::RecordedResult;
use super::types::{
    AlternativeMode, ConditionalAlternative, Direction, Outcome, SingleAlternative, TradeCondition,
};
use crate::common::errors::Result;
use crate::common::normalize::{parse_numeric, parse_optional_numeric};
use crate::common::retry::{poll_until, PollStep};
use crate::common::types::{LiveValue, NewsEvent, Timeline, TimelineEntry, TimelineKey};
use crate::notify::chart::{prepare_series, ChartRequest, DEFAULT_CAP, NFP_CAP};
use crate::notify::format::{
    alternative_mismatch_text, alternative_timeout_text, no_trade_text, trade_embed,
    ReleasedValues,
};
use crate::store::{load_event, load_events_between};

/// One scheduled trade decision
#[derive(Debug, Clone)]
pub struct TradeRequest {
    /// Condition as it was when the job was scheduled
    pub scheduled: TradeCondition,
    pub event_id: i64,
    /// Dateline of the newest known release before this one
    pub last_dateline: i64,
    /// Take the latest live value without waiting for a new release
    pub immediate: bool,
}

/// Fold a fresh release into a fetched timeline
///
/// An empty timeline gets the release as its only entry. A last entry
/// older than `last_dateline` is replaced; otherwise the release is
/// appended when it is newer than the last entry.
pub fn merge_release(entries: &mut Vec<TimelineEntry>, fresh: TimelineEntry, last_dateline: i64) {
    match entries.last().map(|entry| entry.dateline) {
        None => entries.push(fresh),
        Some(dateline) if dateline < last_dateline => {
            if let Some(slot) = entries.last_mut() {
                *slot = fresh;
            }
        }
        Some(dateline) if dateline < fresh.dateline => entries.push(fresh),
        Some(_) => {}
    }
}

/// Timeline entry for the value just polled
pub fn release_entry(event_id: i64, live: &LiveValue, actual: f64) -> TimelineEntry {
    let date = Utc
        .timestamp_opt(live.dateline, 0)
        .single()
        .map(|t| t.format("%b %Y").to_string())
        .unwrap_or_default();
    let previous = live.previous.trim();

    TimelineEntry {
        actual: Some(actual),
        actual_formatted: Some(live.actual.clone()),
        date,
        dateline: live.dateline,
        forecast: parse_optional_numeric(&live.forecast),
        forecast_formatted: Some(live.forecast.clone()),
        id: event_id,
        is_active: true,
        is_most_recent: true,
        revision: parse_optional_numeric(previous),
        revision_formatted: (!previous.is_empty()).then(|| previous.to_string()),
    }
}

pub struct TradeEngine {
    ctx: TradeContext,
}

impl TradeEngine {
    pub fn new(ctx: TradeContext) -> Self {
        Self { ctx }
    }

    /// Run and log any error instead of returning it
    pub async fn run_logged(&self, request: TradeRequest) {
        let name = request.scheduled.event_name.clone();
        match self.run(request).await {
            Ok(outcome) => info!("Trade decision for {} finished: {:?}", name, outcome),
            Err(e) => error!("Trade decision for {} failed: {}", name, e),
        }
    }

    #[instrument(
        skip(self, request),
        fields(event = %request.scheduled.event_name, id = request.event_id)
    )]
    pub async fn run(&self, request: TradeRequest) -> Result<Outcome> {
        let settings = &self.ctx.settings;
        let scheduled = &request.scheduled;

        let Some(condition) = self
            .ctx
            .conditions
            .find_condition(&scheduled.event_name, &scheduled.currency)
            .await?
        else {
            info!("News {} not found", scheduled.event_name);
            return Ok(Outcome::ConditionMissing);
        };

        let Some(event) = load_event(self.ctx.news.as_ref(), request.event_id, &settings.tz).await?
        else {
            warn!("Event {} is not stored", request.event_id);
            return Ok(Outcome::ConditionMissing);
        };

        let started = Instant::now();
        let Some(live) = self
            .poll_release(request.event_id, request.last_dateline, request.immediate)
            .await
        else {
            warn!("News {} did not update the actual value", event.event_name);
            return Ok(Outcome::NotReleased);
        };
        let took = started.elapsed();

        if live.actual.trim().is_empty() {
            warn!("News {} has no actual value yet", event.event_name);
            return Ok(Outcome::NotReleased);
        }
        let actual = parse_numeric(&live.actual)?;

        let direction = classify(&condition, actual, event.forecast);
        info!(
            "{} actual {} {} forecast {} → {:?}",
            event.event_name,
            actual,
            comparison_sign(actual, event.forecast),
            event.forecast,
            direction
        );

        self.ctx
            .registry
            .record(
                &condition.currency,
                &condition.label,
                RecordedResult {
                    actual,
                    forecast: event.forecast,
                },
            )
            .await;

        let Some(direction) = direction else {
            self.ctx
                .dispatcher
                .send_no_trade(&no_trade_text(&event, actual))
                .await;
            return Ok(Outcome::NoTrade);
        };

        if let Some(outcome) = self.resolve_dependencies(&condition, &event, actual).await? {
            return Ok(outcome);
        }

        let timeline = self
            .refresh_timeline(&event, &live, actual, request.last_dateline)
            .await?;

        let delay = condition.delay_for(direction);
        if !delay.is_zero() {
            debug!("Delaying {} announcement by {:?}", direction, delay);
            sleep(delay).await;
        }

        let delivered = self
            .announce(&condition, &event, &live, direction, &timeline, took)
            .await;
        Ok(Outcome::Announced {
            direction,
            delivered,
        })
    }

    async fn poll_release(
        &self,
        event_id: i64,
        last_dateline: i64,
        immediate: bool,
    ) -> Option<LiveValue> {
        let source = &self.ctx.source;
        poll_until(&self.ctx.settings.release_poll, move |attempt| async move {
            debug!("Trying for {}th time...", attempt);
            match source.fetch_live_value(event_id).await {
                Ok(Some(live)) if immediate || live.is_released_after(last_dateline) => {
                    PollStep::Ready(live)
                }
                Ok(Some(_)) => PollStep::Pending,
                Ok(None) => PollStep::Failed,
                Err(e) => {
                    warn!("Live value fetch for {} failed: {}", event_id, e);
                    PollStep::Failed
                }
            }
        })
        .await
    }

    /// `Some(outcome)` when a dependency ends the run
    async fn resolve_dependencies(
        &self,
        condition: &TradeCondition,
        event: &NewsEvent,
        actual: f64,
    ) -> Result<Option<Outcome>> {
        let settings = &self.ctx.settings;
        if let Some(alternative) = settings.alternatives.get(&condition.label) {
            return self
                .resolve_single(condition, event, actual, alternative)
                .await;
        }
        if let Some(branches) = settings.conditional_alternatives.get(&condition.label) {
            return Ok(self
                .resolve_conditional(condition, event, actual, branches)
                .await);
        }
        Ok(None)
    }

    async fn resolve_single(
        &self,
        condition: &TradeCondition,
        event: &NewsEvent,
        actual: f64,
        alternative: &SingleAlternative,
    ) -> Result<Option<Outcome>> {
        let tz = &self.ctx.settings.tz;
        let (start, end) = today_window(Utc::now(), tz);
        let today = load_events_between(self.ctx.news.as_ref(), start, end, tz).await?;
        if !today.iter().any(|e| e.event_name == alternative.label) {
            debug!("Alternative {} is not released today", alternative.label);
            return Ok(None);
        }

        if alternative.mode == AlternativeMode::Stop {
            info!(
                "{} stopped by alternative {}",
                condition.event_name, alternative.label
            );
            return Ok(Some(Outcome::AlternativeStopped));
        }

        let registry = &self.ctx.registry;
        let currency = condition.currency.as_str();
        let label = alternative.label.as_str();
        let recorded = poll_until(&self.ctx.settings.dependency_poll, move |_| async move {
            match registry.get(currency, label).await {
                Some(result) => PollStep::Ready(result),
                None => PollStep::Pending,
            }
        })
        .await;

        let dispatcher = &self.ctx.dispatcher;
        match recorded {
            Some(result) if same_sign(result.actual, actual) => Ok(None),
            Some(_) => {
                dispatcher
                    .send_no_trade(&alternative_mismatch_text(event, actual, label))
                    .await;
                Ok(Some(Outcome::AlternativeMismatch))
            }
            None => {
                dispatcher
                    .send_no_trade(&alternative_timeout_text(event, actual, &[label]))
                    .await;
                Ok(Some(Outcome::AlternativeTimeout))
            }
        }
    }

    async fn resolve_conditional(
        &self,
        condition: &TradeCondition,
        event: &NewsEvent,
        actual: f64,
        branches: &[ConditionalAlternative],
    ) -> Option<Outcome> {
        let labels: Vec<&str> = branches
            .iter()
            .map(|b| b.alt.label.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let registry = &self.ctx.registry;
        let currency = condition.currency.as_str();
        let awaited = labels.as_slice();
        let appeared = poll_until(&self.ctx.settings.dependency_poll, move |_| async move {
            if registry.contains_any(currency, awaited).await {
                PollStep::Ready(())
            } else {
                PollStep::Pending
            }
        })
        .await;

        let dispatcher = &self.ctx.dispatcher;
        if appeared.is_none() {
            dispatcher
                .send_no_trade(&alternative_timeout_text(event, actual, &labels))
                .await;
            return Some(Outcome::AlternativeTimeout);
        }

        let recorded = registry.for_currency(currency).await;
        match first_satisfied_branch(branches, actual, event.forecast, |label| {
            recorded.get(label).copied()
        }) {
            Some(branch) => {
                info!(
                    "{} proceeds on alternative {}",
                    condition.event_name, branch.alt.label
                );
                None
            }
            None => {
                dispatcher.send_no_trade(&no_trade_text(event, actual)).await;
                Some(Outcome::NoTrade)
            }
        }
    }

    async fn refresh_timeline(
        &self,
        event: &NewsEvent,
        live: &LiveValue,
        actual: f64,
        last_dateline: i64,
    ) -> Result<Timeline> {
        let mut entries = self.ctx.source.fetch_timeline(event.event_id).await;
        merge_release(
            &mut entries,
            release_entry(event.event_id, live, actual),
            last_dateline,
        );

        let timeline = Timeline {
            key: TimelineKey::for_event(event),
            event_id: event.event_id,
            entries,
        };
        self.ctx.timelines.upsert_timeline(&timeline).await?;
        Ok(timeline)
    }

    /// Render the chart, post the embed; returns delivered channel count
    async fn announce(
        &self,
        condition: &TradeCondition,
        event: &NewsEvent,
        live: &LiveValue,
        direction: Direction,
        timeline: &Timeline,
        took: std::time::Duration,
    ) -> usize {
        let settings = &self.ctx.settings;
        let cap = if condition.is_nfp() { NFP_CAP } else { DEFAULT_CAP };
        let request = ChartRequest {
            series: prepare_series(&timeline.entries, &settings.tz, cap),
            currency: condition.currency.clone(),
            title: condition.title.clone(),
            label: condition.label.clone(),
            file_stem: format!("chart_{}_{}", event.event_id, live.dateline),
        };
        let chart = match self.ctx.charts.render(&request) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Chart for {} failed: {}", event.event_name, e);
                None
            }
        };

        let values = ReleasedValues {
            actual: live.actual.clone(),
            forecast: live.forecast.clone(),
            previous: live.previous.clone(),
        };
        let embed = trade_embed(
            event,
            condition,
            direction,
            &values,
            took,
            event.detail_link(&settings.site_url),
            &settings.brand,
        );

        let dispatcher = &self.ctx.dispatcher;
        let channels = dispatcher.announcement_channels(&condition.channels);
        let report = dispatcher
            .announce(channels, &embed, chart.as_deref(), &condition.label)
            .await;

        if let Some(path) = chart {
            if report.failed == 0 {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            } else {
                warn!("Keeping {} after failed delivery", path.display());
            }
        }
        report.delivered
    }
}
