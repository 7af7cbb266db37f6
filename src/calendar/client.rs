//! HTTP client for the ForexFactory calendar endpoints

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use super::messages::{CalendarDay, CalendarResponse, CalendarSettingsRequest, TimelineResponse};
use crate::common::errors::{BotError, Result};
use crate::common::traits::CalendarSource;
use crate::common::types::{LiveValue, TimelineEntry};
use crate::config::types::SourceConfig;

/// Number of historical releases requested from the graph endpoint
const TIMELINE_LIMIT: u32 = 200;

/// REST client for the calendar site
#[derive(Debug, Clone)]
pub struct CalendarClient {
    /// HTTP client
    client: Client,
    /// "Apply settings" endpoint returning the calendar window
    calendar_url: String,
    /// Base URL of the per-event graph endpoint
    graph_url: String,
    /// Base URL of the per-event live JSON endpoint
    event_url: String,
}

impl CalendarClient {
    /// Create a new client from the source configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Self::with_timeout(
            config,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Create a new client with a custom timeout
    pub fn with_timeout(config: &SourceConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BotError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            calendar_url: config.calendar_url.clone(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            event_url: config.event_url.trim_end_matches('/').to_string(),
        })
    }

    fn timeline_url(&self, event_id: i64) -> Result<Url> {
        let limit = TIMELINE_LIMIT.to_string();
        Ok(Url::parse_with_params(
            &format!("{}/{}", self.graph_url, event_id),
            &[("limit", limit.as_str()), ("site_id", "1")],
        )?)
    }

    fn live_value_url(&self, event_id: i64) -> String {
        format!("{}/{}.json", self.event_url, event_id)
    }

    async fn try_fetch_timeline(&self, event_id: i64) -> Result<Vec<TimelineEntry>> {
        let url = self.timeline_url(event_id)?;
        debug!("Fetching timeline from: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::UpstreamUnavailable(format!(
                "Graph endpoint returned status {}: {}",
                status, body
            )));
        }

        let timeline: TimelineResponse = response.json().await?;
        Ok(timeline.data.events)
    }
}

#[async_trait]
impl CalendarSource for CalendarClient {
    #[instrument(skip(self))]
    async fn fetch_calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        let body = serde_json::to_string(&CalendarSettingsRequest::for_range(start, end))?;
        debug!("Fetching calendar window from: {}", self.calendar_url);

        let response = self
            .client
            .post(&self.calendar_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::UpstreamUnavailable(format!(
                "Calendar returned status {}: {}",
                status, body
            )));
        }

        let calendar: CalendarResponse = response.json().await?;
        Ok(calendar.days)
    }

    #[instrument(skip(self))]
    async fn fetch_timeline(&self, event_id: i64) -> Vec<TimelineEntry> {
        match self.try_fetch_timeline(event_id).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error fetching timeline for {}: {}", event_id, e);
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    async fn fetch_live_value(&self, event_id: i64) -> Result<Option<LiveValue>> {
        let url = self.live_value_url(event_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            debug!("Live value for {} unavailable: {}", event_id, response.status());
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }
}
