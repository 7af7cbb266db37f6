//! Event matcher: today's stored events against the configured conditions

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::announcement::{AnnouncementRequest, PreAnnouncement};
use super::context::TradeContext;
use super::engine::{TradeEngine, TradeRequest};
use super::types::TradeCondition;
use crate::common::errors::Result;
use crate::common::types::NewsEvent;
use crate::scheduler::JobScheduler;
use crate::store::load_events_between;

/// Local midnight of `now`'s day in `tz` through the next midnight, in UTC
pub fn today_window(now: DateTime<Utc>, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(tz).date_naive();
    let start = local_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + ChronoDuration::days(1))
}

/// Whether `condition` is the rule for `event`
///
/// Names compare case-insensitively. When the condition's currency differs
/// from its country the event name must mention the country.
pub fn condition_matches(condition: &TradeCondition, event: &NewsEvent) -> bool {
    if !condition.event_name.eq_ignore_ascii_case(&event.event_name)
        || condition.currency != event.currency
    {
        return false;
    }
    if condition.currency != condition.country {
        return event
            .event_name
            .to_lowercase()
            .contains(&condition.country.to_lowercase());
    }
    true
}

/// First condition matching `event`
pub fn first_match<'a>(
    conditions: &'a [TradeCondition],
    event: &NewsEvent,
) -> Option<&'a TradeCondition> {
    conditions.iter().find(|c| condition_matches(c, event))
}

pub fn announcement_job_id(event_name: &str) -> String {
    format!("fifteen_minutes_announcement(\"{}\")", event_name)
}

pub fn trade_job_id(event_name: &str) -> String {
    format!("trade_decision(\"{}\")", event_name)
}

/// What one matcher pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Today's events with a condition
    pub matched: usize,
    /// Newly scheduled jobs (pre-announcements and trade decisions)
    pub scheduled: usize,
    /// Past events run right away
    pub ran_previous: usize,
    /// Past events left alone
    pub skipped_past: usize,
}

pub struct EventMatcher {
    ctx: TradeContext,
    scheduler: JobScheduler,
    engine: Arc<TradeEngine>,
    announcer: Arc<PreAnnouncement>,
}

impl EventMatcher {
    pub fn new(ctx: TradeContext, scheduler: JobScheduler) -> Self {
        Self {
            engine: Arc::new(TradeEngine::new(ctx.clone())),
            announcer: Arc::new(PreAnnouncement::new(ctx.clone())),
            ctx,
            scheduler,
        }
    }

    pub fn engine(&self) -> &Arc<TradeEngine> {
        &self.engine
    }

    /// Match today's events and schedule (or run) their trade decisions
    #[instrument(skip(self))]
    pub async fn run(&self, send_previous: bool, now: DateTime<Utc>) -> Result<MatchReport> {
        let tz = self.ctx.settings.tz;
        let (start, end) = today_window(now, &tz);
        let events = load_events_between(self.ctx.news.as_ref(), start, end, &tz).await?;
        let conditions = self.ctx.conditions.all_conditions().await?;
        debug!(
            "Matching {} events against {} conditions",
            events.len(),
            conditions.len()
        );

        let mut report = MatchReport::default();
        for event in &events {
            let Some(condition) = first_match(&conditions, event) else {
                continue;
            };
            report.matched += 1;

            if event.is_past(now) {
                if send_previous {
                    self.run_previous(condition, event).await;
                    report.ran_previous += 1;
                } else {
                    report.skipped_past += 1;
                }
                continue;
            }

            report.scheduled += self.schedule(condition, event, now).await;
        }

        info!(
            "Matcher pass: {} matched, {} jobs scheduled, {} run, {} past skipped",
            report.matched, report.scheduled, report.ran_previous, report.skipped_past
        );
        Ok(report)
    }

    async fn last_dateline(&self, event_id: i64) -> i64 {
        self.ctx
            .source
            .fetch_timeline(event_id)
            .await
            .last()
            .map(|entry| entry.dateline)
            .unwrap_or(0)
    }

    async fn run_previous(&self, condition: &TradeCondition, event: &NewsEvent) {
        info!("Sending previous result for {}", event.event_name);
        let request = TradeRequest {
            scheduled: condition.clone(),
            event_id: event.event_id,
            last_dateline: self.last_dateline(event.event_id).await,
            immediate: true,
        };
        self.engine.run_logged(request).await;
    }

    /// Returns the number of newly scheduled jobs
    async fn schedule(
        &self,
        condition: &TradeCondition,
        event: &NewsEvent,
        now: DateTime<Utc>,
    ) -> usize {
        let trade_id = trade_job_id(&event.event_name);
        // Already handled by an earlier pass
        if self.scheduler.has_job(&trade_id).await {
            debug!("Job {} already exists", trade_id);
            return 0;
        }

        let release = event.event_time.with_timezone(&Utc);
        let last_dateline = self.last_dateline(event.event_id).await;
        let mut scheduled = 0;

        let lead = ChronoDuration::minutes(self.ctx.settings.pre_announcement_minutes);
        let announce_at = release - lead;
        let announcement = AnnouncementRequest {
            scheduled: condition.clone(),
            event_id: event.event_id,
            less_than: announce_at <= now,
        };
        let announcer = Arc::clone(&self.announcer);
        if self
            .scheduler
            .schedule_at(
                &announcement_job_id(&event.event_name),
                announce_at.max(now),
                async move { announcer.run_logged(announcement).await },
            )
            .await
        {
            scheduled += 1;
        }

        let request = TradeRequest {
            scheduled: condition.clone(),
            event_id: event.event_id,
            last_dateline,
            immediate: false,
        };
        let engine = Arc::clone(&self.engine);
        if self
            .scheduler
            .schedule_at(&trade_id, release, async move {
                engine.run_logged(request).await
            })
            .await
        {
            scheduled += 1;
        }

        scheduled
    }
}
