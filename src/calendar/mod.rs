//! Calendar site access and synchronization

pub mod client;
pub mod messages;
pub mod sync;

pub use client::CalendarClient;
pub use sync::{default_window, CalendarSync, SyncOutcome, SyncReport};
