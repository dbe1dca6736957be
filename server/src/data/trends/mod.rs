//! Real-time trend feed adapter

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::constants::{TREND_BASE_URL, YOUTUBE_TIMEOUT_SECS};
use crate::data::types::TrendItem;

/// Errors from the trend feed
#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Trend feed transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Trend feed API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl TrendError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Trend feed surface used by the idea step
#[async_trait]
pub trait TrendFeed: Send + Sync {
    /// Currently trending searches for a region, best first
    async fn realtime_trends(&self, limit: usize) -> Result<Vec<TrendItem>, TrendError>;
}

/// SerpApi-backed Google Trends "trending now" client
pub struct SerpTrendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    geo: String,
}

impl SerpTrendClient {
    pub fn new(api_key: String, geo: String) -> Result<Self, TrendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(YOUTUBE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: TREND_BASE_URL.to_string(),
            api_key,
            geo,
        })
    }
}

#[async_trait]
impl TrendFeed for SerpTrendClient {
    async fn realtime_trends(&self, limit: usize) -> Result<Vec<TrendItem>, TrendError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("engine", "google_trends_trending_now"),
                ("geo", self.geo.as_str()),
                ("hours", "24"),
                ("only_active", "true"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TrendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_trending_searches(&body, limit))
    }
}

/// Parse the `trending_searches` array of the feed response
fn parse_trending_searches(body: &Value, limit: usize) -> Vec<TrendItem> {
    body["trending_searches"]
        .as_array()
        .into_iter()
        .flatten()
        .take(limit)
        .map(|search| TrendItem {
            keyword: search["query"].as_str().unwrap_or_default().to_string(),
            search_volume: search["search_volume"].as_i64().unwrap_or(0),
            increase_percentage: search["increase_percentage"].as_f64().unwrap_or(0.0),
            categories: search["categories"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|c| c["name"].as_str().map(String::from))
                .collect(),
            trend_breakdown: search["trend_breakdown"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|t| t.as_str().map(String::from))
                .collect(),
        })
        .collect()
}
