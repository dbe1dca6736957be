//! YouTube Data v3 client
//!
//! Video details, channel statistics, comment threads (paginated) and the
//! category-popular chart. The pipeline consumes the trait, never the raw
//! client, so handlers are testable without network access.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::YoutubeError;
use crate::core::constants::{
    COMMENT_PAGE_SIZE, YOUTUBE_DATA_BASE_URL, YOUTUBE_TIMEOUT_SECS,
};
use crate::data::types::{ChannelStats, FetchedComment, PopularVideo, VideoDetails};

/// YouTube Data v3 surface used by the pipeline
#[async_trait]
pub trait VideoDataApi: Send + Sync {
    /// Snippet + statistics + duration for one video
    async fn video_details(&self, youtube_video_id: &str) -> Result<VideoDetails, YoutubeError>;

    /// Aggregate channel statistics
    async fn channel_stats(&self, youtube_channel_id: &str) -> Result<ChannelStats, YoutubeError>;

    /// Top-level comments and replies, flattened, up to `cap`.
    /// Disabled comments surface as `YoutubeError::CommentsDisabled`.
    async fn comment_threads(
        &self,
        youtube_video_id: &str,
        cap: usize,
    ) -> Result<Vec<FetchedComment>, YoutubeError>;

    /// Top-N most popular videos in a category
    async fn category_popular(
        &self,
        category_id: i64,
        limit: usize,
    ) -> Result<Vec<PopularVideo>, YoutubeError>;
}

/// Data v3 client authenticated with an API key
pub struct YoutubeDataClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YoutubeDataClient {
    pub fn new(api_key: String) -> Result<Self, YoutubeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(YOUTUBE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: YOUTUBE_DATA_BASE_URL.to_string(),
            api_key,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, YoutubeError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
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
impl VideoDataApi for YoutubeDataClient {
    async fn video_details(&self, youtube_video_id: &str) -> Result<VideoDetails, YoutubeError> {
        let body = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails".to_string()),
                    ("id", youtube_video_id.to_string()),
                ],
            )
            .await?;

        let item = body["items"]
            .get(0)
            .ok_or_else(|| YoutubeError::Malformed(format!("no video {youtube_video_id}")))?;

        Ok(parse_video_details(item))
    }

    async fn channel_stats(&self, youtube_channel_id: &str) -> Result<ChannelStats, YoutubeError> {
        let body = self
            .get_json(
                "channels",
                &[
                    ("part", "statistics".to_string()),
                    ("id", youtube_channel_id.to_string()),
                ],
            )
            .await?;

        let stats = &body["items"]
            .get(0)
            .ok_or_else(|| YoutubeError::Malformed(format!("no channel {youtube_channel_id}")))?
            ["statistics"];

        Ok(ChannelStats {
            subscriber_count: string_number(&stats["subscriberCount"]),
            view_count: string_number(&stats["viewCount"]),
            video_count: string_number(&stats["videoCount"]),
        })
    }

    async fn comment_threads(
        &self,
        youtube_video_id: &str,
        cap: usize,
    ) -> Result<Vec<FetchedComment>, YoutubeError> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet,replies".to_string()),
                ("videoId", youtube_video_id.to_string()),
                ("maxResults", COMMENT_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let body = self.get_json("commentThreads", &query).await?;

            for item in body["items"].as_array().into_iter().flatten() {
                let top = &item["snippet"]["topLevelComment"]["snippet"];
                comments.push(parse_comment(top));

                for reply in item["replies"]["comments"].as_array().into_iter().flatten() {
                    comments.push(parse_comment(&reply["snippet"]));
                }

                if comments.len() >= cap {
                    comments.truncate(cap);
                    return Ok(comments);
                }
            }

            match body["nextPageToken"].as_str() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(comments)
    }

    async fn category_popular(
        &self,
        category_id: i64,
        limit: usize,
    ) -> Result<Vec<PopularVideo>, YoutubeError> {
        let body = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet".to_string()),
                    ("chart", "mostPopular".to_string()),
                    ("videoCategoryId", category_id.to_string()),
                    ("maxResults", limit.to_string()),
                ],
            )
            .await?;

        let videos = body["items"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|item| {
                let snippet = &item["snippet"];
                PopularVideo {
                    title: snippet["title"].as_str().unwrap_or_default().to_string(),
                    description: snippet["description"].as_str().unwrap_or_default().to_string(),
                    hash_tags: snippet["tags"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|t| t.as_str().map(String::from))
                        .collect(),
                }
            })
            .collect();

        Ok(videos)
    }
}

fn parse_comment(snippet: &Value) -> FetchedComment {
    FetchedComment {
        content: snippet["textDisplay"].as_str().unwrap_or_default().to_string(),
        published_at: snippet["publishedAt"].as_str().unwrap_or_default().to_string(),
        like_count: snippet["likeCount"].as_i64().unwrap_or(0),
    }
}

fn parse_video_details(item: &Value) -> VideoDetails {
    let snippet = &item["snippet"];
    let stats = &item["statistics"];

    VideoDetails {
        title: snippet["title"].as_str().unwrap_or_default().to_string(),
        description: snippet["description"].as_str().unwrap_or_default().to_string(),
        tags: snippet["tags"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|t| t.as_str().map(String::from))
            .collect(),
        published_at: snippet["publishedAt"].as_str().unwrap_or_default().to_string(),
        duration_sec: parse_iso8601_duration(
            item["contentDetails"]["duration"].as_str().unwrap_or_default(),
        ),
        view_count: string_number(&stats["viewCount"]),
        like_count: string_number(&stats["likeCount"]),
        comment_count: string_number(&stats["commentCount"]),
        channel_id: snippet["channelId"].as_str().map(String::from),
        channel_title: snippet["channelTitle"].as_str().unwrap_or_default().to_string(),
    }
}

/// Data v3 encodes counters as JSON strings
fn string_number(value: &Value) -> i64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

/// Parse an ISO-8601 duration like `PT1H2M3S` into seconds
fn parse_iso8601_duration(raw: &str) -> u64 {
    let Some(rest) = raw.strip_prefix("PT") else {
        return 0;
    };

    let mut total = 0u64;
    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().unwrap_or(0);
        digits.clear();
        total += match c {
            'H' => value * 3600,
            'M' => value * 60,
            'S' => value,
            _ => 0,
        };
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT5M"), 300);
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso8601_duration("PT45S"), 45);
        assert_eq!(parse_iso8601_duration("P1D"), 0);
        assert_eq!(parse_iso8601_duration(""), 0);
    }

    #[test]
    fn test_string_number() {
        assert_eq!(string_number(&json!("12345")), 12345);
        assert_eq!(string_number(&json!(678)), 678);
        assert_eq!(string_number(&json!(null)), 0);
        assert_eq!(string_number(&json!("not a number")), 0);
    }

    #[test]
    fn test_parse_video_details() {
        let item = json!({
            "snippet": {
                "title": "weeknight curry",
                "description": "a 20 minute curry",
                "tags": ["curry", "cooking"],
                "publishedAt": "2025-05-01T12:00:00Z",
                "channelId": "UC42",
                "channelTitle": "cooking lab"
            },
            "statistics": {"viewCount": "10000", "likeCount": "300", "commentCount": "41"},
            "contentDetails": {"duration": "PT5M"}
        });

        let details = parse_video_details(&item);
        assert_eq!(details.title, "weeknight curry");
        assert_eq!(details.duration_sec, 300);
        assert_eq!(details.view_count, 10000);
        assert_eq!(details.tags, vec!["curry", "cooking"]);
        assert_eq!(details.channel_id.as_deref(), Some("UC42"));
    }
}
