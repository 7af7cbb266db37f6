//! NewsTrader Library
//!
//! Scrapes the economic calendar, keeps event history in a document store
//! and announces rule-based trade directions to chat channels when
//! tradeable events are released.

pub mod calendar;
pub mod common;
pub mod config;
pub mod notify;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod strategy;

// Re-export commonly used types
pub use calendar::{CalendarClient, CalendarSync, SyncOutcome, SyncReport};
pub use common::errors::{BotError, Result};
pub use common::types::{LiveValue, NewsEvent, RawNewsRecord, Timeline, TimelineEntry, TimelineKey};
pub use config::types::AppConfig;
pub use notify::{DiscordClient, Dispatcher, Embed, PlottersChart, TelegramClient};
pub use scheduler::JobScheduler;
pub use service::{NewsService, Stores};
pub use store::{InMemoryStore, PostgresStore};

// Strategy types
pub use strategy::{
    Direction, EventMatcher, MatchReport, Outcome, PendingResultRegistry, TradeCondition,
    TradeContext, TradeEngine, TradeRequest,
};
