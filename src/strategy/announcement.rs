//! Pre-announcement posted ahead of a release and retracted after it

use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::context::TradeContext;
use super::types::TradeCondition;
use crate::calendar::sync::SyncOutcome;
use crate::common::errors::Result;
use crate::notify::format::pre_announcement_embed;
use crate::store::load_event;

#[derive(Debug, Clone)]
pub struct AnnouncementRequest {
    pub scheduled: TradeCondition,
    pub event_id: i64,
    /// Scheduled after the lead time already passed
    pub less_than: bool,
}

/// Messages posted and later deleted by one pre-announcement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnouncementReport {
    pub posted: usize,
    pub retracted: usize,
}

pub struct PreAnnouncement {
    ctx: TradeContext,
}

impl PreAnnouncement {
    pub fn new(ctx: TradeContext) -> Self {
        Self { ctx }
    }

    pub async fn run_logged(&self, request: AnnouncementRequest) {
        let name = request.scheduled.event_name.clone();
        if let Err(e) = self.run(request).await {
            error!("Pre-announcement for {} failed: {}", name, e);
        }
    }

    #[instrument(skip(self, request), fields(event = %request.scheduled.event_name))]
    pub async fn run(&self, request: AnnouncementRequest) -> Result<AnnouncementReport> {
        let settings = &self.ctx.settings;
        let scheduled = &request.scheduled;

        let Some(condition) = self
            .ctx
            .conditions
            .find_condition(&scheduled.event_name, &scheduled.currency)
            .await?
        else {
            info!("News {} not found", scheduled.event_name);
            return Ok(AnnouncementReport::default());
        };

        match self.ctx.sync.sync_fast(Utc::now()).await {
            Ok(SyncOutcome::Completed(report)) => {
                info!("Fast sync refreshed {} events", report.events)
            }
            Ok(SyncOutcome::Skipped) => {}
            Err(e) => warn!("Fast sync before announcement failed: {}", e),
        }

        let Some(event) = load_event(self.ctx.news.as_ref(), request.event_id, &settings.tz).await?
        else {
            warn!("Event {} is not stored", request.event_id);
            return Ok(AnnouncementReport::default());
        };

        let embed = pre_announcement_embed(
            &event,
            &condition,
            settings.pre_announcement_minutes,
            request.less_than,
            &settings.tz,
            &settings.brand,
        );
        let dispatcher = &self.ctx.dispatcher;
        let sent = dispatcher
            .post(dispatcher.announcement_channels(&condition.channels), &embed)
            .await;

        let cleanup_at = event.event_time.with_timezone(&Utc)
            + ChronoDuration::seconds(settings.cleanup_grace_seconds);
        let wait = (cleanup_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        sleep(wait).await;

        let retracted = dispatcher.retract(&sent).await;
        Ok(AnnouncementReport {
            posted: sent.len(),
            retracted,
        })
    }
}
