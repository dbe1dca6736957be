//! YouTube Analytics v2 client
//!
//! Retention curves and per-video engagement totals, fetched with the
//! caller's OAuth access token (the Data v3 API key has no access to
//! analytics reports).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::YoutubeError;
use crate::core::constants::{YOUTUBE_ANALYTICS_URL, YOUTUBE_TIMEOUT_SECS};
use crate::data::types::{AnalyticsTotals, RetentionRow};

/// Analytics v2 surface used by the pipeline
#[async_trait]
pub trait RetentionApi: Send + Sync {
    /// Retention curve samples for one video (≤100 rows)
    async fn retention_rows(
        &self,
        access_token: &str,
        youtube_video_id: &str,
    ) -> Result<Vec<RetentionRow>, YoutubeError>;

    /// Engagement totals for one video (SEO/revisit inputs).
    /// `total_duration_sec` is not an analytics metric; callers fill it from
    /// the Data v3 duration.
    async fn video_totals(
        &self,
        access_token: &str,
        youtube_video_id: &str,
    ) -> Result<AnalyticsTotals, YoutubeError>;
}

/// Analytics v2 client
pub struct YoutubeAnalyticsClient {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeAnalyticsClient {
    pub fn new() -> Result<Self, YoutubeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(YOUTUBE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: YOUTUBE_ANALYTICS_URL.to_string(),
        })
    }

    async fn report(
        &self,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<Value, YoutubeError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(query)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::from_status(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RetentionApi for YoutubeAnalyticsClient {
    async fn retention_rows(
        &self,
        access_token: &str,
        youtube_video_id: &str,
    ) -> Result<Vec<RetentionRow>, YoutubeError> {
        let body = self
            .report(
                access_token,
                &[
                    ("ids", "channel==MINE".to_string()),
                    ("metrics", "audienceWatchRatio,relativeRetentionPerformance".to_string()),
                    ("dimensions", "elapsedVideoTimeRatio".to_string()),
                    ("filters", format!("video=={youtube_video_id}")),
                ],
            )
            .await?;

        Ok(parse_retention_rows(&body))
    }

    async fn video_totals(
        &self,
        access_token: &str,
        youtube_video_id: &str,
    ) -> Result<AnalyticsTotals, YoutubeError> {
        let body = self
            .report(
                access_token,
                &[
                    ("ids", "channel==MINE".to_string()),
                    (
                        "metrics",
                        "views,likes,shares,subscribersGained,averageViewDuration".to_string(),
                    ),
                    ("filters", format!("video=={youtube_video_id}")),
                ],
            )
            .await?;

        let row = body["rows"]
            .get(0)
            .and_then(|r| r.as_array())
            .ok_or_else(|| YoutubeError::Malformed("analytics totals missing rows".into()))?;

        let number = |i: usize| row.get(i).and_then(Value::as_f64).unwrap_or(0.0);

        Ok(AnalyticsTotals {
            views: number(0) as i64,
            likes: number(1) as i64,
            shares: number(2) as i64,
            subscribers_gained: number(3) as i64,
            average_view_duration: number(4),
            total_duration_sec: 0.0,
        })
    }
}

/// Parse `rows` of `(elapsed_ratio, audienceWatchRatio, relativeRetentionPerformance)`
fn parse_retention_rows(body: &Value) -> Vec<RetentionRow> {
    body["rows"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|row| {
            let row = row.as_array()?;
            Some(RetentionRow {
                elapsed_ratio: row.first()?.as_f64()?,
                audience_watch_ratio: row.get(1)?.as_f64()?,
                relative_retention_performance: row.get(2)?.as_f64()?,
            })
        })
        .collect()
}

/// Elapsed-ratio of the sharpest inter-sample drop in `audienceWatchRatio`,
/// restricted to `elapsed_ratio < 0.95` so the natural end-of-video falloff
/// is excluded. An empty (or single-sample) curve yields 0.
pub fn worst_drop_ratio(rows: &[RetentionRow]) -> f64 {
    let filtered: Vec<&RetentionRow> = rows.iter().filter(|r| r.elapsed_ratio < 0.95).collect();

    let mut max_drop = 0.0;
    let mut drop_point = 0.0;

    for pair in filtered.windows(2) {
        let drop = pair[0].audience_watch_ratio - pair[1].audience_watch_ratio;
        if drop > max_drop {
            max_drop = drop;
            drop_point = pair[1].elapsed_ratio;
        }
    }

    drop_point
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(elapsed: f64, watch: f64) -> RetentionRow {
        RetentionRow {
            elapsed_ratio: elapsed,
            audience_watch_ratio: watch,
            relative_retention_performance: 1.0,
        }
    }

    #[test]
    fn test_parse_retention_rows() {
        let body = json!({"rows": [[0.0, 1.0, 1.1], [0.01, 0.95, 1.0]]});
        let rows = parse_retention_rows(&body);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].elapsed_ratio, 0.01);
        assert_eq!(rows[1].audience_watch_ratio, 0.95);
    }

    #[test]
    fn test_parse_retention_rows_empty() {
        assert!(parse_retention_rows(&json!({})).is_empty());
        assert!(parse_retention_rows(&json!({"rows": []})).is_empty());
    }

    #[test]
    fn test_worst_drop_ratio_empty_is_zero() {
        assert_eq!(worst_drop_ratio(&[]), 0.0);
        assert_eq!(worst_drop_ratio(&[row(0.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_worst_drop_ratio_finds_sharpest_drop() {
        let rows = vec![
            row(0.00, 1.00),
            row(0.25, 0.90),
            row(0.50, 0.50), // sharpest drop lands here
            row(0.75, 0.45),
        ];
        assert_eq!(worst_drop_ratio(&rows), 0.50);
    }

    #[test]
    fn test_worst_drop_ratio_ignores_tail() {
        let rows = vec![
            row(0.00, 1.00),
            row(0.40, 0.90),
            row(0.96, 0.10), // end-of-video falloff, excluded
        ];
        assert_eq!(worst_drop_ratio(&rows), 0.40);
    }
}
