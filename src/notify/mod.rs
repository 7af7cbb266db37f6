//! Chat delivery: clients, message formatting, chart rendering

pub mod chart;
pub mod discord;
pub mod dispatch;
pub mod format;
pub mod telegram;
pub mod types;

pub use chart::{ChartRequest, ChartSeries, PlottersChart};
pub use discord::DiscordClient;
pub use dispatch::{DeliveryReport, DispatchTargets, Dispatcher};
pub use telegram::TelegramClient;
pub use types::{ChannelMessage, Embed, SentMessage};
