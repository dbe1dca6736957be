//! Comment pipeline
//!
//! Fetch → sample → LLM-classify → stratified-extrapolate → per-emotion
//! LLM-summarize → persist. Sampling bounds LLM cost on high-comment videos;
//! the measured emotion distribution is extended to the full population by
//! weighted random assignment. Summaries only ever see sampled comments -
//! extrapolated labels have no verified content→label linkage.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::index::sample as index_sample;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::core::constants::{
    COMMENT_FETCH_CAP, COMMENT_SAMPLE_MIN, COMMENT_SAMPLE_RATE, COMMENT_SAMPLE_THRESHOLD,
    DEFAULT_JSON_RETRY_BUDGET,
};
use crate::data::sqlite::repositories::{comment, report};
use crate::data::types::{CommentType, FetchedComment, NewComment, ReportPatch, VideoRow};
use crate::data::youtube::{VideoDataApi, YoutubeError};
use crate::domain::error::StepError;
use crate::domain::rag::{RagError, RagExecutor, prompts};

/// Final per-bucket comment counts for a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmotionCounts {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub advice: i64,
}

impl EmotionCounts {
    pub fn total(&self) -> i64 {
        self.positive + self.negative + self.neutral + self.advice
    }

    fn get(&self, bucket: CommentType) -> i64 {
        match bucket {
            CommentType::Positive => self.positive,
            CommentType::Negative => self.negative,
            CommentType::Neutral => self.neutral,
            CommentType::AdviceOpinion => self.advice,
        }
    }

    fn bump(&mut self, bucket: CommentType) {
        match bucket {
            CommentType::Positive => self.positive += 1,
            CommentType::Negative => self.negative += 1,
            CommentType::Neutral => self.neutral += 1,
            CommentType::AdviceOpinion => self.advice += 1,
        }
    }

    /// Report patch writing the four counter columns in one upsert
    pub fn to_patch(&self) -> ReportPatch {
        ReportPatch {
            positive_comment: Some(self.positive),
            negative_comment: Some(self.negative),
            neutral_comment: Some(self.neutral),
            advice_comment: Some(self.advice),
            ..Default::default()
        }
    }
}

/// Uniform sample without replacement. Below the threshold the full index
/// range is returned unsampled; at or above it, `max(min_size, ⌊n·rate⌋)`
/// indices are drawn.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    threshold: usize,
    rate: f64,
    min_size: usize,
) -> (Vec<usize>, bool) {
    if n < threshold {
        return ((0..n).collect(), false);
    }

    let size = min_size.max((n as f64 * rate) as usize).min(n);
    let mut indices = index_sample(rng, n, size).into_vec();
    indices.sort_unstable();
    (indices, true)
}

/// Extend sampled bucket counts to the full population: each unsampled
/// comment draws a bucket from the sampled distribution. The result always
/// sums to `total`.
pub fn extrapolate_counts<R: Rng + ?Sized>(
    rng: &mut R,
    sampled: &EmotionCounts,
    total: i64,
) -> EmotionCounts {
    let mut counts = *sampled;
    let remaining = total - sampled.total();
    if remaining <= 0 {
        return counts;
    }

    let weights: Vec<i64> = CommentType::ALL.iter().map(|b| sampled.get(*b)).collect();
    let Ok(dist) = WeightedIndex::new(&weights) else {
        // Degenerate distribution (no classified samples): everything neutral
        counts.neutral += remaining;
        return counts;
    };

    for _ in 0..remaining {
        counts.bump(CommentType::ALL[dist.sample(rng)]);
    }

    counts
}

/// Index of a bucket in `CommentType::ALL`
fn bucket_slot(bucket: CommentType) -> usize {
    match bucket {
        CommentType::Positive => 0,
        CommentType::Negative => 1,
        CommentType::Neutral => 2,
        CommentType::AdviceOpinion => 3,
    }
}

#[derive(Deserialize)]
struct EmotionReply {
    emotion: i64,
}

#[derive(Deserialize)]
struct SummaryItem {
    content: String,
}

/// Comment pipeline service
pub struct CommentPipeline {
    pool: SqlitePool,
    data_api: Arc<dyn VideoDataApi>,
    rag: Arc<RagExecutor>,
    threshold: usize,
    rate: f64,
    min_sample: usize,
    fetch_cap: usize,
    json_retry_budget: u32,
}

impl CommentPipeline {
    pub fn new(pool: SqlitePool, data_api: Arc<dyn VideoDataApi>, rag: Arc<RagExecutor>) -> Self {
        Self {
            pool,
            data_api,
            rag,
            threshold: COMMENT_SAMPLE_THRESHOLD,
            rate: COMMENT_SAMPLE_RATE,
            min_sample: COMMENT_SAMPLE_MIN,
            fetch_cap: COMMENT_FETCH_CAP,
            json_retry_budget: DEFAULT_JSON_RETRY_BUDGET,
        }
    }

    /// Classify one comment into an emotion bucket. A parse failure falls
    /// back to NEUTRAL; transport errors propagate.
    async fn classify(&self, content: &str) -> Result<CommentType, StepError> {
        let result: Result<EmotionReply, RagError> = self
            .rag
            .execute_chain_json(
                content,
                "Classify the emotion and reply with pure JSON.",
                prompts::COMMENT_REACTION,
                1,
            )
            .await;

        match result {
            Ok(reply) => Ok(CommentType::from_emotion_code(reply.emotion)),
            Err(RagError::JsonParse { .. }) => Ok(CommentType::Neutral),
            Err(e) => Err(e.into()),
        }
    }

    /// Summarize one bucket's sampled comments into short statements.
    /// Parse exhaustion degrades to an empty list (nothing persisted).
    async fn summarize_bucket(&self, contents: &str) -> Result<Vec<String>, StepError> {
        let result: Result<Vec<SummaryItem>, RagError> = self
            .rag
            .execute_chain_json(
                contents,
                "Summarize these comments and reply with pure JSON.",
                prompts::COMMENT_SUMMARY,
                self.json_retry_budget,
            )
            .await;

        match result {
            Ok(items) => Ok(items.into_iter().map(|i| i.content).collect()),
            Err(RagError::JsonParse { .. }) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the full comment sub-phase for a report. Returns the extrapolated
    /// full-video emotion counts (also persisted onto the report row).
    pub async fn analyze(
        &self,
        video: &VideoRow,
        report_id: i64,
    ) -> Result<EmotionCounts, StepError> {
        let fetched = match self
            .data_api
            .comment_threads(&video.youtube_video_id, self.fetch_cap)
            .await
        {
            Ok(comments) => comments,
            Err(YoutubeError::CommentsDisabled) => {
                tracing::info!(report_id, "Comments disabled, recording zero counts");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let counts = if fetched.is_empty() {
            EmotionCounts::default()
        } else {
            self.classify_and_summarize(&fetched, report_id).await?
        };

        report::update_report(&self.pool, report_id, &counts.to_patch()).await?;
        Ok(counts)
    }

    async fn classify_and_summarize(
        &self,
        fetched: &[FetchedComment],
        report_id: i64,
    ) -> Result<EmotionCounts, StepError> {
        let (indices, is_sampled) = sample_indices(
            &mut rand::thread_rng(),
            fetched.len(),
            self.threshold,
            self.rate,
            self.min_sample,
        );

        tracing::info!(
            report_id,
            total = fetched.len(),
            sampled = indices.len(),
            is_sampled,
            "Classifying comments"
        );

        // Bucketed sampled comments, indexed in CommentType::ALL order so
        // summarization is deterministic
        let mut buckets: [Vec<&FetchedComment>; 4] = Default::default();
        let mut sampled_counts = EmotionCounts::default();

        for &idx in &indices {
            let comment = &fetched[idx];
            let bucket = self.classify(&comment.content).await?;
            sampled_counts.bump(bucket);
            buckets[bucket_slot(bucket)].push(comment);
        }

        let counts = if is_sampled {
            extrapolate_counts(&mut rand::thread_rng(), &sampled_counts, fetched.len() as i64)
        } else {
            sampled_counts
        };

        // Summarization operates on the sampled buckets only
        let mut summary_rows = Vec::new();
        for (slot, bucket) in buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let contents = bucket
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            for content in self.summarize_bucket(&contents).await? {
                summary_rows.push(NewComment {
                    report_id,
                    content,
                    comment_type: CommentType::ALL[slot],
                    like_count: 0,
                });
            }
        }
        comment::insert_bulk(&self.pool, &summary_rows).await?;

        tracing::info!(
            report_id,
            positive = counts.positive,
            negative = counts.negative,
            neutral = counts.neutral,
            advice = counts.advice,
            summaries = summary_rows.len(),
            "Comment analysis complete"
        );
        Ok(counts)
    }
}
