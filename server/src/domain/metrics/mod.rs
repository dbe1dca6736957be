//! Metrics analyzer
//!
//! Consistency (embedding similarity to sibling videos), SEO score, revisit
//! rate, and channel/topic average deltas. Scoring is pure; the analyzer
//! orchestrates repository and embedding access around it.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::data::openai::EmbeddingModel;
use crate::data::sqlite::repositories::video;
use crate::data::types::{AnalyticsTotals, ReportPatch, VideoRow};
use crate::data::vector::cosine_similarity;
use crate::domain::error::StepError;

/// Normalization targets: engagement per 1000 views considered "perfect"
const TARGET_LIKES_PER_1000: f64 = 30.0;
const TARGET_SHARES_PER_1000: f64 = 5.0;
const TARGET_SUBSCRIBERS_PER_1000: f64 = 5.0;

/// Weighted sum weights (sum to 100)
const WEIGHT_DURATION: f64 = 50.0;
const WEIGHT_LIKES: f64 = 15.0;
const WEIGHT_SHARES: f64 = 15.0;
const WEIGHT_SUBSCRIBERS: f64 = 20.0;

/// Truncate (not round) to two decimals
fn truncate_2(value: f64) -> f64 {
    (value * 100.0).trunc() / 100.0
}

/// SEO score in [0, 100], one decimal. Zero views short-circuits to 0.
pub fn seo_score(totals: &AnalyticsTotals) -> f64 {
    if totals.views == 0 {
        return 0.0;
    }
    let views = totals.views as f64;

    let likes_per_1000 = totals.likes as f64 / views * 1000.0;
    let shares_per_1000 = totals.shares as f64 / views * 1000.0;
    let subscribers_per_1000 = totals.subscribers_gained as f64 / views * 1000.0;

    let duration = if totals.total_duration_sec > 0.0 {
        (totals.average_view_duration / totals.total_duration_sec).min(1.0)
    } else {
        0.0
    };
    let likes_rate = (likes_per_1000 / TARGET_LIKES_PER_1000).min(1.0);
    let shares_rate = (shares_per_1000 / TARGET_SHARES_PER_1000).min(1.0);
    let subscribers_rate = (subscribers_per_1000 / TARGET_SUBSCRIBERS_PER_1000).min(1.0);

    let total = WEIGHT_DURATION * duration
        + WEIGHT_LIKES * likes_rate
        + WEIGHT_SHARES * shares_rate
        + WEIGHT_SUBSCRIBERS * subscribers_rate;

    (total * 10.0).round() / 10.0
}

/// Revisit rate: engaged actions per view as a percentage, two decimals.
/// Zero views short-circuits to 0.
pub fn revisit_rate(totals: &AnalyticsTotals) -> f64 {
    if totals.views == 0 {
        return 0.0;
    }

    let engaged = (totals.likes + totals.shares + totals.subscribers_gained) as f64;
    let rate = engaged / totals.views as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Percent deltas of the target's counters against channel and topic peers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AverageDeltas {
    pub view_channel: f64,
    pub view_topic: f64,
    pub like_channel: f64,
    pub like_topic: f64,
    pub comment_channel: f64,
    pub comment_topic: f64,
}

/// `Δ% = ((target − mean_peers) / mean_peers) · 100`, truncated to two
/// decimals. The peer set excludes the target itself; an empty peer set or
/// a zero mean yields 0.
fn percent_delta(target: i64, peers: &[i64]) -> f64 {
    if peers.is_empty() {
        return 0.0;
    }
    let mean = peers.iter().sum::<i64>() as f64 / peers.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    truncate_2((target as f64 - mean) / mean * 100.0)
}

/// Compute all six deltas for a target against channel and topic peer sets
pub fn average_deltas(
    target: &VideoRow,
    channel_videos: &[VideoRow],
    topic_videos: &[VideoRow],
) -> AverageDeltas {
    let metric = |rows: &[VideoRow], pick: fn(&VideoRow) -> i64| -> Vec<i64> {
        rows.iter().filter(|v| v.id != target.id).map(pick).collect()
    };

    let views = |v: &VideoRow| v.view.unwrap_or(0);
    let likes = |v: &VideoRow| v.like_count.unwrap_or(0);
    let comments = |v: &VideoRow| v.comment_count.unwrap_or(0);

    AverageDeltas {
        view_channel: percent_delta(views(target), &metric(channel_videos, views)),
        view_topic: percent_delta(views(target), &metric(topic_videos, views)),
        like_channel: percent_delta(likes(target), &metric(channel_videos, likes)),
        like_topic: percent_delta(likes(target), &metric(topic_videos, likes)),
        comment_channel: percent_delta(comments(target), &metric(channel_videos, comments)),
        comment_topic: percent_delta(comments(target), &metric(topic_videos, comments)),
    }
}

/// Metrics analyzer service
pub struct MetricsAnalyzer {
    pool: SqlitePool,
    embeddings: Arc<dyn EmbeddingModel>,
}

impl MetricsAnalyzer {
    pub fn new(pool: SqlitePool, embeddings: Arc<dyn EmbeddingModel>) -> Self {
        Self { pool, embeddings }
    }

    /// Consistency score: mean cosine similarity between the target's
    /// title+description embedding and every sibling video on the channel,
    /// scaled to [0, 100]. A channel with no siblings scores 100.
    pub async fn consistency(&self, target: &VideoRow) -> Result<f64, StepError> {
        let siblings: Vec<VideoRow> = video::list_by_channel(&self.pool, target.channel_id)
            .await?
            .into_iter()
            .filter(|v| v.id != target.id)
            .collect();

        if siblings.is_empty() {
            return Ok(100.0);
        }

        let target_embedding = self.embeddings.embed(&embedding_text(target)).await?;

        let mut total = 0.0f64;
        for sibling in &siblings {
            let embedding = self.embeddings.embed(&embedding_text(sibling)).await?;
            total += cosine_similarity(&target_embedding, &embedding);
        }

        let score = total / siblings.len() as f64 * 100.0;
        Ok(score.round())
    }

    /// Full metrics pass: concept + seo + revisit + six deltas, plus the raw
    /// engagement counters they are derived from, as one report patch.
    pub async fn analyze(
        &self,
        target: &VideoRow,
        totals: &AnalyticsTotals,
    ) -> Result<ReportPatch, StepError> {
        let channel_videos = video::list_by_channel(&self.pool, target.channel_id).await?;
        let topic_videos = video::list_by_category(&self.pool, target.video_category).await?;

        let deltas = average_deltas(target, &channel_videos, &topic_videos);
        let concept = self.consistency(target).await?;

        Ok(ReportPatch {
            view: target.view,
            like_count: target.like_count,
            comment: target.comment_count,
            view_channel_avg: Some(deltas.view_channel),
            view_topic_avg: Some(deltas.view_topic),
            like_channel_avg: Some(deltas.like_channel),
            like_topic_avg: Some(deltas.like_topic),
            comment_channel_avg: Some(deltas.comment_channel),
            comment_topic_avg: Some(deltas.comment_topic),
            concept: Some(concept),
            seo: Some(seo_score(totals)),
            revisit: Some(revisit_rate(totals)),
            ..Default::default()
        })
    }
}

fn embedding_text(video: &VideoRow) -> String {
    format!(
        "{} {}",
        video.title.as_deref().unwrap_or_default(),
        video.description.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::video::insert_test_video;
    use crate::data::vector::testing::HashEmbedder;

    fn totals(
        views: i64,
        likes: i64,
        shares: i64,
        subs: i64,
        avd: f64,
        duration: f64,
    ) -> AnalyticsTotals {
        AnalyticsTotals {
            views,
            likes,
            shares,
            subscribers_gained: subs,
            average_view_duration: avd,
            total_duration_sec: duration,
        }
    }

    fn video_row(id: i64, channel: i64, category: i64, view: i64, like: i64, comment: i64) -> VideoRow {
        VideoRow {
            id,
            channel_id: channel,
            youtube_video_id: format!("yt{id}"),
            video_category: category,
            title: Some(format!("video {id}")),
            description: Some("desc".into()),
            view: Some(view),
            like_count: Some(like),
            comment_count: Some(comment),
        }
    }

    #[test]
    fn test_seo_happy_path() {
        // views=10000, likes=300 (30/1000), avd 120 of 300s,
        // shares=50 (5/1000), subs=50 (5/1000)
        let score = seo_score(&totals(10_000, 300, 50, 50, 120.0, 300.0));
        assert_eq!(score, 70.0);
    }

    #[test]
    fn test_seo_zero_views() {
        assert_eq!(seo_score(&totals(0, 100, 10, 5, 60.0, 300.0)), 0.0);
    }

    #[test]
    fn test_seo_subscores_clip_at_one() {
        // Absurd engagement still caps every sub-score
        let score = seo_score(&totals(100, 10_000, 10_000, 10_000, 9_999.0, 300.0));
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_revisit_happy_path() {
        let rate = revisit_rate(&totals(10_000, 300, 50, 50, 0.0, 0.0));
        assert_eq!(rate, 4.0);
    }

    #[test]
    fn test_revisit_zero_views() {
        assert_eq!(revisit_rate(&totals(0, 300, 50, 50, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_revisit_rounds_two_decimals() {
        // 100 * 1/3 = 33.333... -> 33.33
        let rate = revisit_rate(&totals(300, 1, 0, 0, 0.0, 0.0));
        assert_eq!(rate, 0.33);
    }

    #[test]
    fn test_percent_delta_truncates() {
        // (150 - 120) / 120 * 100 = 25.0
        assert_eq!(percent_delta(150, &[100, 140]), 25.0);
        // (100 - 30) / 30 * 100 = 233.333... -> truncated, not rounded
        assert_eq!(percent_delta(100, &[30]), 233.33);
        assert_eq!(percent_delta(10, &[]), 0.0);
        assert_eq!(percent_delta(10, &[0, 0]), 0.0);
    }

    #[test]
    fn test_average_deltas_single_video_channel() {
        let target = video_row(1, 7, 24, 1000, 100, 10);
        let deltas = average_deltas(&target, &[target.clone()], &[target.clone()]);
        assert_eq!(deltas, AverageDeltas::default());
    }

    #[tokio::test]
    async fn test_consistency_no_siblings_is_100() {
        let pool = init_memory_pool().await.unwrap();
        let target = video_row(1, 7, 24, 0, 0, 0);
        insert_test_video(&pool, &target).await;

        let analyzer = MetricsAnalyzer::new(pool, Arc::new(HashEmbedder::default()));
        let score = analyzer.consistency(&video_row(1, 7, 24, 0, 0, 0)).await.unwrap();
        assert_eq!(score, 100.0);
    }

    #[tokio::test]
    async fn test_consistency_identical_siblings_is_100() {
        let pool = init_memory_pool().await.unwrap();
        // Same title/description => identical hash embeddings => cosine 1.0
        let a = VideoRow { title: Some("same".into()), description: Some("text".into()), ..video_row(0, 7, 24, 0, 0, 0) };
        let id_a = insert_test_video(&pool, &a).await;
        insert_test_video(&pool, &a).await;

        let analyzer = MetricsAnalyzer::new(pool.clone(), Arc::new(HashEmbedder::default()));
        let target = crate::data::sqlite::repositories::video::get_video(&pool, id_a)
            .await
            .unwrap()
            .unwrap();
        let score = analyzer.consistency(&target).await.unwrap();
        assert_eq!(score, 100.0);
    }

    #[tokio::test]
    async fn test_analyze_builds_full_patch() {
        let pool = init_memory_pool().await.unwrap();
        let target_id = insert_test_video(&pool, &video_row(0, 7, 24, 10_000, 300, 41)).await;
        insert_test_video(&pool, &video_row(0, 7, 24, 5_000, 100, 20)).await;

        let target = crate::data::sqlite::repositories::video::get_video(&pool, target_id)
            .await
            .unwrap()
            .unwrap();

        let analyzer = MetricsAnalyzer::new(pool, Arc::new(HashEmbedder::default()));
        let patch = analyzer
            .analyze(&target, &totals(10_000, 300, 50, 50, 120.0, 300.0))
            .await
            .unwrap();

        assert_eq!(patch.seo, Some(70.0));
        assert_eq!(patch.revisit, Some(4.0));
        assert_eq!(patch.view, Some(10_000));
        // (10000 - 5000) / 5000 * 100 = 100.00
        assert_eq!(patch.view_channel_avg, Some(100.0));
        assert!(patch.concept.is_some());
        assert!(patch.summary.is_none());
    }
}
