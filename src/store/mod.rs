//! Document stores for news events, timelines and trade conditions

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::common::errors::Result;
use crate::common::normalize::{normalize_all, normalize_event};
use crate::common::traits::NewsStore;
use crate::common::types::NewsEvent;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Stored events in `[start, end)`, normalized; bad documents are dropped
pub async fn load_events_between(
    store: &dyn NewsStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: &Tz,
) -> Result<Vec<NewsEvent>> {
    let docs = store.events_between(start, end).await?;
    Ok(normalize_all(docs, tz))
}

/// One stored event, normalized
pub async fn load_event(
    store: &dyn NewsStore,
    event_id: i64,
    tz: &Tz,
) -> Result<Option<NewsEvent>> {
    match store.event_document(event_id).await? {
        Some(doc) => Ok(Some(normalize_event(&doc, tz)?)),
        None => Ok(None),
    }
}
