//! Trade decision engine scenarios over in-memory stores and recording fakes
//!
//! Time is paused, so the 1000-attempt polls finish instantly.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;

use common::*;
use news_trader::common::retry::RetryPolicy;
use news_trader::common::traits::{NewsStore, TimelineStore, TradeConditionStore};
use news_trader::common::types::TimelineKey;
use news_trader::strategy::engine::{TradeEngine, TradeRequest};
use news_trader::strategy::registry::RecordedResult;
use news_trader::strategy::types::{
    AlternativeMode, AlternativeRef, Comparison, ConditionalAlternative, Direction, Outcome,
    SingleAlternative, TradeCondition,
};

const EVENT_ID: i64 = 135981;
const EBASE_ID: i64 = 77;

struct Scenario {
    harness: Harness,
    condition: TradeCondition,
    release: i64,
    last_dateline: i64,
}

impl Scenario {
    async fn new(
        config: news_trader::AppConfig,
        condition: TradeCondition,
        forecast: &str,
        actual: &str,
    ) -> Self {
        let harness = Harness::with_config(config);
        let release_time = Utc::now() - ChronoDuration::minutes(1);
        let release = release_time.timestamp();
        let last_dateline = release - 30 * 86_400;

        harness.store.upsert_condition(&condition).await.unwrap();
        harness
            .store
            .upsert_events(&[record(
                EVENT_ID,
                &condition.event_name,
                &condition.currency,
                release_time,
                forecast,
                EBASE_ID,
            )])
            .await
            .unwrap();
        harness.source.set_timeline(EVENT_ID, history(12, last_dateline));
        harness.source.set_live(EVENT_ID, live(release, actual, forecast));

        Self {
            harness,
            condition,
            release,
            last_dateline,
        }
    }

    async fn run(&self) -> Outcome {
        TradeEngine::new(self.harness.ctx.clone())
            .run(TradeRequest {
                scheduled: self.condition.clone(),
                event_id: EVENT_ID,
                last_dateline: self.last_dateline,
                immediate: false,
            })
            .await
            .unwrap()
    }

    async fn stored_timeline_len(&self) -> Option<usize> {
        let key = TimelineKey::new(&self.condition.event_name, &self.condition.currency, EBASE_ID);
        self.harness
            .store
            .timeline(&key)
            .await
            .unwrap()
            .map(|t| t.entries.len())
    }
}

fn cpi(bull: &str, eq: &str) -> TradeCondition {
    condition("CPI (MoM)", "CPI", "USD", bull, eq)
}

// ============================================================================
// Classification
// ============================================================================

#[test_log::test(tokio::test(start_paused = true))]
async fn test_beat_with_above_announces_long() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.5%").await;

    let outcome = scenario.run().await;

    assert_eq!(
        outcome,
        Outcome::Announced {
            direction: Direction::Long,
            delivered: 2
        }
    );
    let embeds = scenario.harness.discord.embeds();
    assert_eq!(embeds.len(), 2);
    assert_eq!(embeds[0].1.title, "USD CPI (MoM)");
    assert!(embeds[0].1.description.contains("Triggered main pairs: USDJPY (Long)"));
    assert!(embeds[0].2, "chart should be attached");
    assert!(scenario.harness.discord.texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_miss_with_above_announces_short() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.1%").await;
    assert!(matches!(
        scenario.run().await,
        Outcome::Announced {
            direction: Direction::Short,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_tie_follows_equal_condition() {
    let scenario = Scenario::new(test_config(), cpi("above", "short"), "0.3%", "0.3%").await;
    assert!(matches!(
        scenario.run().await,
        Outcome::Announced {
            direction: Direction::Short,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_tie_without_equal_condition_is_no_trade() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.3%").await;

    assert_eq!(scenario.run().await, Outcome::NoTrade);

    let texts = scenario.harness.discord.texts();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, NO_TRADE_CHANNEL);
    assert!(texts[0].1.contains("No trade triggered"));
    assert_eq!(scenario.harness.telegram.posts().len(), 1);
    assert!(scenario.harness.discord.embeds().is_empty());

    // Dependents are unblocked by the tie as well
    assert_eq!(
        scenario.harness.ctx.registry.get("USD", "CPI").await,
        Some(RecordedResult {
            actual: 0.3,
            forecast: 0.3
        })
    );
}

// ============================================================================
// Release poll
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_condition_terminates() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.5%").await;
    let engine = TradeEngine::new(scenario.harness.ctx.clone());

    let outcome = engine
        .run(TradeRequest {
            scheduled: condition("Retail Sales (MoM)", "RS", "USD", "above", "none"),
            event_id: EVENT_ID,
            last_dateline: 0,
            immediate: false,
        })
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::ConditionMissing);
    assert_eq!(scenario.harness.source.live_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreleased_value_gives_up_silently() {
    let mut config = test_config();
    config.engine.release_poll = RetryPolicy::new(3, std::time::Duration::from_secs(2));
    let scenario = Scenario::new(config, cpi("above", "none"), "0.3%", "0.5%").await;
    scenario
        .harness
        .source
        .set_live(EVENT_ID, live(scenario.last_dateline, "0.4%", "0.3%"));

    assert_eq!(scenario.run().await, Outcome::NotReleased);
    assert_eq!(scenario.harness.source.live_calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert!(scenario.harness.discord.texts().is_empty());
    assert!(scenario.harness.ctx.registry.is_empty().await);
}

// ============================================================================
// Dependencies
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_single_alternative_opposite_sign_is_mismatch() {
    let mut config = test_config();
    config.trading.alternatives.insert(
        "CPI".to_string(),
        SingleAlternative {
            label: "Core CPI (MoM)".to_string(),
            mode: AlternativeMode::Follow,
        },
    );
    let scenario = Scenario::new(config, cpi("above", "none"), "0.3%", "0.5%").await;
    scenario
        .harness
        .store
        .upsert_events(&[record(2, "Core CPI (MoM)", "USD", Utc::now(), "0.2%", 78)])
        .await
        .unwrap();
    scenario
        .harness
        .ctx
        .registry
        .record(
            "USD",
            "Core CPI (MoM)",
            RecordedResult {
                actual: -0.1,
                forecast: 0.2,
            },
        )
        .await;

    assert_eq!(scenario.run().await, Outcome::AlternativeMismatch);

    let texts = scenario.harness.discord.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].1.contains("Core CPI (MoM)"));
    assert!(scenario.harness.discord.embeds().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_single_alternative_stop_mode() {
    let mut config = test_config();
    config.trading.alternatives.insert(
        "CPI".to_string(),
        SingleAlternative {
            label: "Core CPI (MoM)".to_string(),
            mode: AlternativeMode::Stop,
        },
    );
    let scenario = Scenario::new(config, cpi("above", "none"), "0.3%", "0.5%").await;
    scenario
        .harness
        .store
        .upsert_events(&[record(2, "Core CPI (MoM)", "USD", Utc::now(), "0.2%", 78)])
        .await
        .unwrap();

    assert_eq!(scenario.run().await, Outcome::AlternativeStopped);
    assert!(scenario.harness.discord.texts().is_empty());
    assert!(scenario.harness.discord.embeds().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_single_alternative_not_today_proceeds() {
    let mut config = test_config();
    config.trading.alternatives.insert(
        "CPI".to_string(),
        SingleAlternative {
            label: "Core CPI (MoM)".to_string(),
            mode: AlternativeMode::Stop,
        },
    );
    let scenario = Scenario::new(config, cpi("above", "none"), "0.3%", "0.5%").await;

    assert!(matches!(scenario.run().await, Outcome::Announced { .. }));
}

fn ppi_branches() -> Vec<ConditionalAlternative> {
    vec![
        ConditionalAlternative {
            condition: Comparison::Above,
            alt: AlternativeRef {
                label: "CPI".to_string(),
                condition: Comparison::Above,
            },
        },
        ConditionalAlternative {
            condition: Comparison::Above,
            alt: AlternativeRef {
                label: "CPI".to_string(),
                condition: Comparison::Below,
            },
        },
    ]
}

fn ppi() -> TradeCondition {
    condition("PPI (MoM)", "PPI", "USD", "above", "none")
}

#[tokio::test(start_paused = true)]
async fn test_conditional_second_branch_proceeds() {
    let mut config = test_config();
    config
        .trading
        .conditional_alternatives
        .insert("PPI".to_string(), ppi_branches());
    let scenario = Scenario::new(config, ppi(), "0.3%", "0.5%").await;
    scenario
        .harness
        .ctx
        .registry
        .record(
            "USD",
            "CPI",
            RecordedResult {
                actual: 0.1,
                forecast: 0.3,
            },
        )
        .await;

    assert!(matches!(
        scenario.run().await,
        Outcome::Announced {
            direction: Direction::Long,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_conditional_no_branch_holds() {
    let mut config = test_config();
    config
        .trading
        .conditional_alternatives
        .insert("PPI".to_string(), ppi_branches());
    // PPI misses, so neither "above" branch holds
    let scenario = Scenario::new(config, ppi(), "0.3%", "0.1%").await;
    scenario
        .harness
        .ctx
        .registry
        .record(
            "USD",
            "CPI",
            RecordedResult {
                actual: 0.5,
                forecast: 0.3,
            },
        )
        .await;

    assert_eq!(scenario.run().await, Outcome::NoTrade);
    assert_eq!(scenario.harness.discord.texts().len(), 1);
    assert_eq!(scenario.stored_timeline_len().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_registry_timeout_sends_one_notice() {
    let mut config = test_config();
    config
        .trading
        .conditional_alternatives
        .insert("PPI".to_string(), ppi_branches());
    let scenario = Scenario::new(config, ppi(), "0.3%", "0.5%").await;
    let started = tokio::time::Instant::now();

    assert_eq!(scenario.run().await, Outcome::AlternativeTimeout);

    assert!(started.elapsed() >= std::time::Duration::from_secs(2000));
    let texts = scenario.harness.discord.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].1.ends_with("failed to match the alternative condition CPI"));
    assert_eq!(scenario.harness.telegram.posts().len(), 1);
    assert_eq!(scenario.stored_timeline_len().await, None);
    assert!(scenario.harness.discord.embeds().is_empty());
}

// ============================================================================
// Timeline and delivery
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timeline_appended_and_chart_removed() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.5%").await;

    scenario.run().await;

    assert_eq!(scenario.stored_timeline_len().await, Some(13));
    let key = TimelineKey::new("CPI (MoM)", "USD", EBASE_ID);
    let timeline = scenario.harness.store.timeline(&key).await.unwrap().unwrap();
    let newest = timeline.entries.last().unwrap();
    assert_eq!(newest.dateline, scenario.release);
    assert_eq!(newest.actual, Some(0.5));
    assert!(newest.is_most_recent);

    let requests = scenario.harness.charts.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].series.len(), 13);
    assert!(!scenario.harness.charts.path_for(&requests[0].file_stem).exists());
}

#[tokio::test(start_paused = true)]
async fn test_failed_channel_keeps_chart() {
    let scenario = Scenario::new(test_config(), cpi("above", "none"), "0.3%", "0.5%").await;
    scenario.harness.discord.fail_channel(ANNOUNCEMENT_CHANNELS[0]);

    let outcome = scenario.run().await;

    assert_eq!(
        outcome,
        Outcome::Announced {
            direction: Direction::Long,
            delivered: 1
        }
    );
    let requests = scenario.harness.charts.requests();
    assert!(scenario.harness.charts.path_for(&requests[0].file_stem).exists());
}

#[tokio::test(start_paused = true)]
async fn test_direction_delay_before_announcement() {
    let mut condition = cpi("above", "none");
    condition.delay_long = 30.0;
    let scenario = Scenario::new(test_config(), condition, "0.3%", "0.5%").await;
    let started = tokio::time::Instant::now();

    scenario.run().await;

    assert!(started.elapsed() >= std::time::Duration::from_secs(30));
    assert_eq!(scenario.harness.discord.embeds().len(), 2);
}
