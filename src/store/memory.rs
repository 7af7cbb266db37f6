//! In-memory store, used when no database is configured and in tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::common::errors::Result;
use crate::common::traits::{NewsStore, TimelineStore, TradeConditionStore};
use crate::common::types::{RawNewsRecord, Timeline, TimelineKey};
use crate::strategy::types::TradeCondition;

/// Holds news documents, timelines and trade conditions in hash maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// event_id → (event time, raw document)
    events: RwLock<HashMap<i64, (DateTime<Utc>, serde_json::Value)>>,
    timelines: RwLock<HashMap<TimelineKey, Timeline>>,
    conditions: RwLock<HashMap<(String, String), TradeCondition>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document as-is, bypassing the record shape
    pub async fn insert_document(
        &self,
        event_id: i64,
        event_time: DateTime<Utc>,
        doc: serde_json::Value,
    ) {
        self.events.write().await.insert(event_id, (event_time, doc));
    }

    pub async fn timeline_count(&self) -> usize {
        self.timelines.read().await.len()
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    async fn upsert_events(&self, records: &[RawNewsRecord]) -> Result<usize> {
        let mut events = self.events.write().await;
        for record in records {
            events.insert(record.event_id, (record.event_time, serde_json::to_value(record)?));
        }
        Ok(records.len())
    }

    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<serde_json::Value>> {
        let events = self.events.read().await;
        let mut matching: Vec<_> = events
            .values()
            .filter(|(time, _)| *time >= start && *time < end)
            .collect();
        matching.sort_by_key(|(time, _)| *time);
        Ok(matching.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    async fn event_document(&self, event_id: i64) -> Result<Option<serde_json::Value>> {
        Ok(self.events.read().await.get(&event_id).map(|(_, doc)| doc.clone()))
    }

    async fn count_events(&self) -> Result<usize> {
        Ok(self.events.read().await.len())
    }
}

#[async_trait]
impl TimelineStore for InMemoryStore {
    async fn upsert_timeline(&self, timeline: &Timeline) -> Result<()> {
        self.timelines
            .write()
            .await
            .insert(timeline.key.clone(), timeline.clone());
        Ok(())
    }

    async fn timeline(&self, key: &TimelineKey) -> Result<Option<Timeline>> {
        Ok(self.timelines.read().await.get(key).cloned())
    }
}

#[async_trait]
impl TradeConditionStore for InMemoryStore {
    async fn all_conditions(&self) -> Result<Vec<TradeCondition>> {
        let conditions = self.conditions.read().await;
        let mut all: Vec<TradeCondition> = conditions.values().cloned().collect();
        all.sort_by(|a, b| {
            a.currency
                .cmp(&b.currency)
                .then_with(|| a.event_name.cmp(&b.event_name))
        });
        Ok(all)
    }

    async fn find_condition(
        &self,
        event_name: &str,
        currency: &str,
    ) -> Result<Option<TradeCondition>> {
        let key = (event_name.to_string(), currency.to_string());
        Ok(self.conditions.read().await.get(&key).cloned())
    }

    async fn upsert_condition(&self, condition: &TradeCondition) -> Result<()> {
        condition.validate()?;
        let key = (condition.event_name.clone(), condition.currency.clone());
        self.conditions.write().await.insert(key, condition.clone());
        Ok(())
    }
}
