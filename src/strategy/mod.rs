//! Trade decisions for released calendar events
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MATCHER (hourly)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  today's events × trade conditions                          │
//! │    - pre-announcement at T-15 min                           │
//! │    - trade decision at T                                    │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ENGINE (one task per release)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  poll live value → classify → record in registry            │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  dependencies (registry polls) → timeline → announce        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Engines for related events only coordinate through the
//! [`PendingResultRegistry`]: each one records `{actual, forecast}` under
//! its label once classified, and dependents poll for it.

pub mod announcement;
pub mod classify;
pub mod context;
pub mod engine;
pub mod matcher;
pub mod registry;
pub mod types;

pub use announcement::{AnnouncementReport, AnnouncementRequest, PreAnnouncement};
pub use context::{TradeContext, TradingSettings};
pub use engine::{TradeEngine, TradeRequest};
pub use matcher::{EventMatcher, MatchReport};
pub use registry::{PendingResultRegistry, RecordedResult};
pub use types::{
    AlternativeMode, BullCondition, Comparison, ConditionalAlternative, Direction, EqCondition,
    Outcome, SingleAlternative, TradeCondition,
};
