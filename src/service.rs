//! Wiring of stores, clients, sync, matcher and scheduler from configuration

use chrono::{NaiveDate, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::calendar::client::CalendarClient;
use crate::calendar::sync::{CalendarSync, SyncReport};
use crate::common::errors::{BotError, Result};
use crate::common::traits::{
    CalendarSource, ChartRenderer, NewsStore, Notifier, TextSink, TimelineStore,
    TradeConditionStore,
};
use crate::config::types::AppConfig;
use crate::notify::chart::PlottersChart;
use crate::notify::discord::DiscordClient;
use crate::notify::dispatch::{DispatchTargets, Dispatcher};
use crate::notify::telegram::TelegramClient;
use crate::scheduler::JobScheduler;
use crate::store::{InMemoryStore, PostgresStore};
use crate::strategy::context::{TradeContext, TradingSettings};
use crate::strategy::matcher::{EventMatcher, MatchReport};
use crate::strategy::registry::PendingResultRegistry;
use crate::strategy::types::TradeCondition;

/// The three stores, backed by one database or one in-memory instance
#[derive(Clone)]
pub struct Stores {
    pub news: Arc<dyn NewsStore>,
    pub timelines: Arc<dyn TimelineStore>,
    pub conditions: Arc<dyn TradeConditionStore>,
}

impl Stores {
    /// Postgres (migrated) when a database is configured, in-memory otherwise
    pub async fn open(config: &AppConfig) -> Result<Self> {
        match &config.database {
            Some(database) => {
                let store = PostgresStore::connect(database).await?;
                store.migrate().await?;
                info!("Using PostgreSQL store");
                Ok(Self::shared(Arc::new(store)))
            }
            None => {
                warn!("No database configured, using in-memory store");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::shared(Arc::new(InMemoryStore::new()))
    }

    fn shared<S>(store: Arc<S>) -> Self
    where
        S: NewsStore + TimelineStore + TradeConditionStore + 'static,
    {
        Self {
            news: store.clone(),
            timelines: store.clone(),
            conditions: store,
        }
    }
}

fn build_sync(
    config: &AppConfig,
    source: Arc<dyn CalendarSource>,
    stores: &Stores,
) -> CalendarSync {
    CalendarSync::new(source, stores.news.clone(), stores.timelines.clone()).with_intervals(
        Duration::from_millis(config.engine.sync_wait_ms),
        Duration::from_millis(config.engine.timeline_pause_ms),
    )
}

/// One full calendar sync, no chat clients needed
pub async fn sync_once(
    config: &AppConfig,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<SyncReport> {
    let stores = Stores::open(config).await?;
    let source: Arc<dyn CalendarSource> = Arc::new(CalendarClient::new(&config.source)?);
    build_sync(config, source, &stores).sync_full(range).await
}

/// Seed trade conditions from a JSON array file
pub async fn import_conditions(stores: &Stores, path: &Path) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let conditions: Vec<TradeCondition> = serde_json::from_str(&raw)?;

    let mut imported = 0;
    for condition in &conditions {
        match stores.conditions.upsert_condition(condition).await {
            Ok(()) => imported += 1,
            Err(BotError::Validation(msg)) => warn!("Skipping condition: {}", msg),
            Err(e) => return Err(e),
        }
    }
    info!("Imported {} of {} conditions", imported, conditions.len());
    Ok(imported)
}

/// Long-running bot: hourly sync and matcher pass, scheduled trade jobs
pub struct NewsService {
    ctx: TradeContext,
    scheduler: JobScheduler,
    matcher: Arc<EventMatcher>,
    sync_interval: Duration,
    send_previous: bool,
}

impl NewsService {
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let stores = Stores::open(config).await?;
        let source: Arc<dyn CalendarSource> = Arc::new(CalendarClient::new(&config.source)?);
        let discord: Arc<dyn Notifier> = Arc::new(DiscordClient::new(&config.discord)?);
        let telegram = match &config.telegram {
            Some(telegram) => Some(Arc::new(TelegramClient::new(telegram)?) as Arc<dyn TextSink>),
            None => None,
        };
        let charts: Arc<dyn ChartRenderer> = Arc::new(PlottersChart::new(config.chart.clone()));

        Self::from_parts(config, stores, source, discord, telegram, charts)
    }

    /// Assemble from already built collaborators
    pub fn from_parts(
        config: &AppConfig,
        stores: Stores,
        source: Arc<dyn CalendarSource>,
        discord: Arc<dyn Notifier>,
        telegram: Option<Arc<dyn TextSink>>,
        charts: Arc<dyn ChartRenderer>,
    ) -> Result<Self> {
        let sync = Arc::new(build_sync(config, source.clone(), &stores));
        let dispatcher = Arc::new(Dispatcher::new(
            discord,
            telegram,
            DispatchTargets::from_config(config),
        ));

        let ctx = TradeContext {
            source,
            news: stores.news,
            timelines: stores.timelines,
            conditions: stores.conditions,
            registry: Arc::new(PendingResultRegistry::new()),
            dispatcher,
            charts,
            sync,
            settings: Arc::new(TradingSettings::from_config(config)?),
        };
        let scheduler = JobScheduler::new();
        let matcher = Arc::new(EventMatcher::new(ctx.clone(), scheduler.clone()));

        Ok(Self {
            ctx,
            scheduler,
            matcher,
            sync_interval: Duration::from_secs(config.settings.sync_interval_minutes.max(1) * 60),
            send_previous: config.trading.send_previous,
        })
    }

    pub fn context(&self) -> &TradeContext {
        &self.ctx
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub async fn sync_once(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<SyncReport> {
        self.ctx.sync.sync_full(range).await
    }

    pub async fn match_once(&self, send_previous: bool) -> Result<MatchReport> {
        self.matcher.run(send_previous, Utc::now()).await
    }

    /// Initial sync and matcher pass, then the periodic job until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        if let Err(e) = self.sync_once(None).await {
            error!("Initial calendar sync failed: {}", e);
        }
        if let Err(e) = self.match_once(self.send_previous).await {
            error!("Initial matcher pass failed: {}", e);
        }

        let sync = Arc::clone(&self.ctx.sync);
        let matcher = Arc::clone(&self.matcher);
        self.scheduler
            .every("calendar_sync", self.sync_interval, move || {
                let sync = Arc::clone(&sync);
                let matcher = Arc::clone(&matcher);
                async move {
                    if let Err(e) = sync.sync_full(None).await {
                        error!("Calendar sync failed: {}", e);
                    }
                    if let Err(e) = matcher.run(false, Utc::now()).await {
                        error!("Matcher pass failed: {}", e);
                    }
                }
            })
            .await;

        info!("Service running, waiting for shutdown signal");
        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal, cleaning up...");
        self.scheduler.shutdown().await;
        Ok(())
    }
}
