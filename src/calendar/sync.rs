//! Calendar sync: window fetch, event upsert and timeline backfill
//!
//! A full sync and the fast (±1 day) refresh share one lock. The full sync
//! waits for it; the fast path never queues behind another sync and instead
//! reports [`SyncOutcome::Skipped`] once the running one has finished.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Months, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::common::errors::Result;
use crate::common::traits::{CalendarSource, NewsStore, TimelineStore};
use crate::common::types::{RawNewsRecord, Timeline, TimelineKey};

const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TIMELINE_PAUSE: Duration = Duration::from_millis(500);

/// Counts from one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Events upserted into the news store
    pub events: usize,
    /// Timelines written during backfill
    pub timelines: usize,
}

/// Result of a fast sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another sync held the lock; its results stand
    Skipped,
}

/// First day of the previous month through the last day of the next month
pub fn default_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month_start = today.with_day(1).unwrap_or(today);
    let start = month_start
        .checked_sub_months(Months::new(1))
        .unwrap_or(month_start);
    let end = month_start
        .checked_add_months(Months::new(2))
        .and_then(|d| d.pred_opt())
        .unwrap_or(today);
    (start, end)
}

/// Keeps the news and timeline stores in step with the calendar site
pub struct CalendarSync {
    source: Arc<dyn CalendarSource>,
    news: Arc<dyn NewsStore>,
    timelines: Arc<dyn TimelineStore>,
    lock: Mutex<()>,
    wait_interval: Duration,
    timeline_pause: Duration,
}

impl CalendarSync {
    pub fn new(
        source: Arc<dyn CalendarSource>,
        news: Arc<dyn NewsStore>,
        timelines: Arc<dyn TimelineStore>,
    ) -> Self {
        Self {
            source,
            news,
            timelines,
            lock: Mutex::new(()),
            wait_interval: DEFAULT_WAIT_INTERVAL,
            timeline_pause: DEFAULT_TIMELINE_PAUSE,
        }
    }

    /// Override the lock poll interval and the pause between timelines
    pub fn with_intervals(mut self, wait_interval: Duration, timeline_pause: Duration) -> Self {
        self.wait_interval = wait_interval;
        self.timeline_pause = timeline_pause;
        self
    }

    /// Whether a sync currently holds the lock
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Fetch and store the given window (default window when `None`),
    /// then backfill one timeline per ebase id
    #[instrument(skip(self))]
    pub async fn sync_full(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<SyncReport> {
        let _guard = self.lock.lock().await;
        let (start, end) = range.unwrap_or_else(|| default_window(Utc::now().date_naive()));
        info!("Updating calendar from {} to {}", start, end);

        let records = self.fetch_records(start, end).await?;
        let events = self.news.upsert_events(&records).await?;
        let timelines = self.backfill_timelines(&records).await;

        info!("Stored {} events and {} timelines", events, timelines);
        Ok(SyncReport { events, timelines })
    }

    /// Refresh events within a day of `now`, without timelines
    #[instrument(skip(self))]
    pub async fn sync_fast(&self, now: DateTime<Utc>) -> Result<SyncOutcome> {
        let _guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Calendar sync already running, waiting for it to finish");
                while self.is_running() {
                    sleep(self.wait_interval).await;
                }
                return Ok(SyncOutcome::Skipped);
            }
        };

        let start = (now - ChronoDuration::days(1)).date_naive();
        let end = (now + ChronoDuration::days(1)).date_naive();
        let records = self.fetch_records(start, end).await?;
        let events = self.news.upsert_events(&records).await?;

        Ok(SyncOutcome::Completed(SyncReport {
            events,
            timelines: 0,
        }))
    }

    /// Flattened window, oldest release first
    async fn fetch_records(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawNewsRecord>> {
        let days = self.source.fetch_calendar(start, end).await?;
        let mut records: Vec<RawNewsRecord> = days
            .into_iter()
            .flat_map(|day| day.events)
            .map(|event| event.into_record())
            .collect();
        records.sort_by_key(|record| record.utc_timestamp);
        info!("Found {} news events", records.len());
        Ok(records)
    }

    async fn backfill_timelines(&self, records: &[RawNewsRecord]) -> usize {
        let mut seen = HashSet::new();
        let mut stored = 0;

        for record in records.iter().rev() {
            if !seen.insert(record.ebase_id) {
                continue;
            }

            let entries = self.source.fetch_timeline(record.event_id).await;
            if entries.is_empty() {
                continue;
            }

            let timeline = Timeline {
                key: TimelineKey::new(&record.event_name, &record.currency, record.ebase_id),
                event_id: record.event_id,
                entries,
            };
            match self.timelines.upsert_timeline(&timeline).await {
                Ok(()) => stored += 1,
                Err(e) => warn!("Failed to store timeline for {}: {}", record.event_name, e),
            }
            sleep(self.timeline_pause).await;
        }

        stored
    }
}
