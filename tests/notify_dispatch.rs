//! Dispatcher: stale-message cleanup and per-channel failure isolation

mod common;

use std::sync::Arc;

use common::*;
use news_trader::common::traits::TextSink;
use news_trader::notify::dispatch::{DispatchTargets, Dispatcher};
use news_trader::notify::types::{ChannelMessage, Embed};

fn text(id: &str, content: &str) -> ChannelMessage {
    ChannelMessage {
        id: id.to_string(),
        content: content.to_string(),
        embeds: vec![],
    }
}

fn embed(id: &str, title: &str) -> ChannelMessage {
    ChannelMessage {
        id: id.to_string(),
        content: String::new(),
        embeds: vec![Embed::new(title, "")],
    }
}

fn dispatcher(discord: Arc<RecordingNotifier>) -> Dispatcher {
    Dispatcher::new(discord, None, DispatchTargets::from_config(&test_config()))
}

#[tokio::test]
async fn test_stale_category_messages_deleted() {
    let discord = Arc::new(RecordingNotifier::default());
    discord.set_history(
        10,
        vec![
            text("1", "NFP is LIVE in 15 minutes"),
            text("2", "CPI will be released in 5 minutes"),
            text("3", "good morning"),
            embed("4", "USD Non Farm Payrolls"),
            embed("5", "Consumer Price Index Calendar"),
        ],
    );

    let deleted = dispatcher(discord.clone()).clear_stale(10, "NFP").await.unwrap();

    assert_eq!(deleted, 3);
    let ids: Vec<String> = discord.deleted().into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, vec!["1", "2", "4"]);
}

#[tokio::test]
async fn test_failing_channel_does_not_stop_the_next() {
    let discord = Arc::new(RecordingNotifier::default());
    discord.fail_channel(10);

    let report = dispatcher(discord.clone())
        .announce(&[10, 11], &Embed::new("USD CPI (MoM)", "Actual: 0.5%"), None, "CPI")
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    let embeds = discord.embeds();
    assert_eq!(embeds.len(), 1);
    assert_eq!(embeds[0].0, 11);
}

#[tokio::test]
async fn test_no_trade_notice_reaches_discord_and_telegram() {
    let discord = Arc::new(RecordingNotifier::default());
    let telegram = Arc::new(RecordingTextSink::default());
    let dispatcher = Dispatcher::new(
        discord.clone(),
        Some(telegram.clone() as Arc<dyn TextSink>),
        DispatchTargets::from_config(&test_config()),
    );

    let report = dispatcher.send_no_trade("USD CPI 0.3 v 0.3. No trade").await;

    assert_eq!(report.delivered, 2);
    assert_eq!(discord.texts()[0].0, NO_TRADE_CHANNEL);
    assert_eq!(telegram.posts()[0].0, NO_TRADE_CHAT);
}

#[tokio::test]
async fn test_post_then_retract() {
    let discord = Arc::new(RecordingNotifier::default());
    let dispatcher = dispatcher(discord.clone());

    let sent = dispatcher
        .post(&ANNOUNCEMENT_CHANNELS, &Embed::new("CPI (MoM) - USD", "LIVE in 15 minutes"))
        .await;
    assert_eq!(sent.len(), 2);

    assert_eq!(dispatcher.retract(&sent).await, 2);
    assert_eq!(discord.deleted().len(), 2);
}
