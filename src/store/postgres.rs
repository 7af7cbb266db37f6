//! PostgreSQL store with JSONB documents

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::common::errors::Result;
use crate::common::traits::{NewsStore, TimelineStore, TradeConditionStore};
use crate::common::types::{RawNewsRecord, Timeline, TimelineEntry, TimelineKey};
use crate::config::types::DatabaseConfig;
use crate::strategy::types::TradeCondition;

/// PostgreSQL storage for events, timelines and trade conditions
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== News events ====================

#[async_trait]
impl NewsStore for PostgresStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_events(&self, records: &[RawNewsRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO news_events (event_id, event_time, doc)
                VALUES ($1, $2, $3)
                ON CONFLICT (event_id) DO UPDATE SET
                    event_time = EXCLUDED.event_time,
                    doc = EXCLUDED.doc,
                    updated_at = NOW()
                "#,
            )
            .bind(record.event_id)
            .bind(record.event_time)
            .bind(Json(record))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(records.len())
    }

    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM news_events
            WHERE event_time >= $1 AND event_time < $2
            ORDER BY event_time ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<serde_json::Value, _>("doc"))
            .collect())
    }

    async fn event_document(&self, event_id: i64) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT doc FROM news_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<serde_json::Value, _>("doc")))
    }

    async fn count_events(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM news_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("total").max(0) as usize)
    }
}

// ==================== Timelines ====================

#[async_trait]
impl TimelineStore for PostgresStore {
    #[instrument(skip(self, timeline), fields(event = %timeline.key.event_name))]
    async fn upsert_timeline(&self, timeline: &Timeline) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_timelines (event_name, currency, ebase_id, event_id, news_line)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_name, currency, ebase_id) DO UPDATE SET
                event_id = EXCLUDED.event_id,
                news_line = EXCLUDED.news_line,
                updated_at = NOW()
            "#,
        )
        .bind(&timeline.key.event_name)
        .bind(&timeline.key.currency)
        .bind(timeline.key.ebase_id)
        .bind(timeline.event_id)
        .bind(Json(&timeline.entries))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn timeline(&self, key: &TimelineKey) -> Result<Option<Timeline>> {
        let row = sqlx::query(
            r#"
            SELECT event_id, news_line FROM event_timelines
            WHERE event_name = $1 AND currency = $2 AND ebase_id = $3
            "#,
        )
        .bind(&key.event_name)
        .bind(&key.currency)
        .bind(key.ebase_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let Json(entries): Json<Vec<TimelineEntry>> = r.get("news_line");
            Timeline {
                key: key.clone(),
                event_id: r.get("event_id"),
                entries,
            }
        }))
    }
}

// ==================== Trade conditions ====================

#[async_trait]
impl TradeConditionStore for PostgresStore {
    async fn all_conditions(&self) -> Result<Vec<TradeCondition>> {
        let rows = sqlx::query(
            "SELECT doc FROM trade_conditions ORDER BY currency ASC, event_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut conditions = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: serde_json::Value = row.get("doc");
            match serde_json::from_value::<TradeCondition>(doc) {
                Ok(condition) => conditions.push(condition),
                Err(e) => warn!("Skipping malformed trade condition: {}", e),
            }
        }
        Ok(conditions)
    }

    async fn find_condition(
        &self,
        event_name: &str,
        currency: &str,
    ) -> Result<Option<TradeCondition>> {
        let row = sqlx::query(
            "SELECT doc FROM trade_conditions WHERE event_name = $1 AND currency = $2",
        )
        .bind(event_name)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(serde_json::from_value(r.get("doc"))?)),
            None => Ok(None),
        }
    }

    async fn upsert_condition(&self, condition: &TradeCondition) -> Result<()> {
        condition.validate()?;
        sqlx::query(
            r#"
            INSERT INTO trade_conditions (event_name, currency, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_name, currency) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(&condition.event_name)
        .bind(&condition.currency)
        .bind(Json(condition))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
