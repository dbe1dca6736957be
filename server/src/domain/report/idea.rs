//! Idea step handler
//!
//! Two sub-phases: trend extraction (real-time feed + channel-tailored LLM
//! keywords) and idea generation grounded on category-popular videos pulled
//! from the vector store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::core::constants::{
    IDEA_POPULAR_COUNT, IDEA_RETRIEVAL_K, SUMMARY_WAIT_ATTEMPTS, SUMMARY_WAIT_DELAY_SECS,
};
use crate::data::sqlite::repositories::{channel, idea, report, trend_keyword};
use crate::data::trends::TrendFeed;
use crate::data::types::{
    ChannelRow, NewIdea, NewTrendKeyword, ReportRow, SourceType, TrendKeywordType, VideoRow,
};
use crate::data::vector::VectorStore;
use crate::data::youtube::VideoDataApi;
use crate::domain::error::StepError;
use crate::domain::rag::{RagError, RagExecutor, prompts};
use crate::domain::report::handler::{StepHandler, StepOutcome, resolve_report_and_video};
use crate::domain::report::message::{Step, StepMessage};

const TREND_QUERY: &str = "Select the trends most suitable as YouTube content and reply with pure JSON.";
const CHANNEL_TREND_QUERY: &str = "Generate 5 trend keywords optimized for this channel and reply with pure JSON.";
const IDEA_QUERY: &str = "Propose 3 new content ideas related to this video and reply with pure JSON.";

#[derive(Deserialize)]
struct TrendReply {
    #[serde(default)]
    trends: Vec<TrendEntry>,
}

#[derive(Deserialize)]
struct TrendEntry {
    keyword: String,
    #[serde(default)]
    score: f64,
}

#[derive(Deserialize)]
struct IdeaItem {
    title: String,
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Idea handler: trend extraction → idea generation
pub struct IdeaHandler {
    pool: SqlitePool,
    vector: Arc<VectorStore>,
    rag: Arc<RagExecutor>,
    data_api: Arc<dyn VideoDataApi>,
    trends: Arc<dyn TrendFeed>,
    trend_limit: usize,
    json_retry_budget: u32,
}

impl IdeaHandler {
    pub fn new(
        pool: SqlitePool,
        vector: Arc<VectorStore>,
        rag: Arc<RagExecutor>,
        data_api: Arc<dyn VideoDataApi>,
        trends: Arc<dyn TrendFeed>,
        trend_limit: usize,
        json_retry_budget: u32,
    ) -> Self {
        Self {
            pool,
            vector,
            rag,
            data_api,
            trends,
            trend_limit,
            json_retry_budget,
        }
    }

    /// Run a trend prompt; parse exhaustion degrades to an empty keyword set
    async fn trend_keywords(
        &self,
        context: &str,
        query: &str,
        template: &str,
    ) -> Result<Vec<TrendEntry>, StepError> {
        let reply: Result<TrendReply, RagError> = self
            .rag
            .execute_chain_json(context, query, template, self.json_retry_budget)
            .await;

        match reply {
            Ok(reply) => Ok(reply.trends),
            Err(RagError::JsonParse { .. }) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sub-phase 1: real-time + channel-tailored trend keywords
    async fn run_trend_subphase(
        &self,
        message: &StepMessage,
        report_row: &ReportRow,
        channel_row: &ChannelRow,
    ) -> Result<(), StepError> {
        // Fetch generously; the LLM triages down to the configured limit
        let raw_trends = self.trends.realtime_trends(self.trend_limit * 2).await?;

        let realtime = if raw_trends.is_empty() {
            Vec::new()
        } else {
            let context = serde_json::to_string(&json!({ "trends_data": raw_trends }))
                .unwrap_or_default();
            self.trend_keywords(&context, TREND_QUERY, prompts::TREND_ANALYSIS)
                .await?
        };

        let channel_context = serde_json::to_string(&json!({
            "channel_concept": channel_row.concept.as_deref().unwrap_or_default(),
            "target_audience": channel_row.target.as_deref().unwrap_or_default(),
        }))
        .unwrap_or_default();
        let tailored = self
            .trend_keywords(&channel_context, CHANNEL_TREND_QUERY, prompts::CHANNEL_TREND)
            .await?;

        let mut keywords = Vec::new();
        for entry in realtime.iter().take(self.trend_limit) {
            keywords.push(NewTrendKeyword {
                report_id: report_row.id,
                keyword_type: TrendKeywordType::RealTime,
                keyword: entry.keyword.clone(),
                score: entry.score.round() as i64,
            });
        }
        for entry in tailored.iter().take(self.trend_limit) {
            keywords.push(NewTrendKeyword {
                report_id: report_row.id,
                keyword_type: TrendKeywordType::Channel,
                keyword: entry.keyword.clone(),
                score: entry.score.round() as i64,
            });
        }
        trend_keyword::insert_bulk(&self.pool, &keywords).await?;

        if !message.skip_vector_save() && !tailored.is_empty() {
            let keyword_text = tailored
                .iter()
                .map(|t| t.keyword.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.vector
                .save_context(
                    SourceType::PersonalizedKeywords,
                    report_row.id,
                    &keyword_text,
                    None,
                )
                .await?;
        }

        tracing::info!(
            report_id = report_row.id,
            realtime = realtime.len(),
            tailored = tailored.len(),
            "Trend extraction sub-phase done"
        );
        Ok(())
    }

    /// Sub-phase 2: category-popular grounding → idea LLM → bulk insert
    async fn run_idea_subphase(
        &self,
        message: &StepMessage,
        report_row: &ReportRow,
        video: &VideoRow,
        channel_row: &ChannelRow,
    ) -> Result<(), StepError> {
        // Best-effort hint, never a barrier
        let summary = wait_for_summary(&self.pool, report_row.id)
            .await
            .unwrap_or_default();
        let summary_slice: String = summary.chars().take(200).collect();

        let populars = self
            .data_api
            .category_popular(video.video_category, IDEA_POPULAR_COUNT)
            .await?;

        if !message.skip_vector_save() {
            for popular in &populars {
                self.vector
                    .save_context(
                        SourceType::IdeaRecommendation,
                        video.id,
                        &popular.as_context(),
                        None,
                    )
                    .await?;
            }
        }

        let query_text = format!(
            "제목: {}, 설명: {}, 카테고리: {}",
            video.title.as_deref().unwrap_or_default(),
            video.description.as_deref().unwrap_or_default(),
            video.video_category,
        );
        let query_embedding = self.vector.generate_embedding(&query_text).await?;
        let similar = self
            .vector
            .search_similar_by_embedding(
                SourceType::IdeaRecommendation,
                &query_embedding,
                None,
                IDEA_RETRIEVAL_K,
            )
            .await?;

        let popularity_context = similar
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let origin_context = format!(
            "- Video title: {}\n- Video description: {}\n- Category: {}\n\
             - Channel: {}\n- Concept: {}\n- Target audience: {}\n- Content: {}",
            video.title.as_deref().unwrap_or_default(),
            video.description.as_deref().unwrap_or_default(),
            video.video_category,
            channel_row.name,
            channel_row.concept.as_deref().unwrap_or_default(),
            channel_row.target.as_deref().unwrap_or_default(),
            summary_slice,
        );

        let prompt = prompts::IDEA
            .replace("{origin}", &origin_context)
            .replace("{popularity}", &popularity_context)
            .replace("{input}", IDEA_QUERY);

        let items: Vec<IdeaItem> = match self
            .rag
            .execute_direct_json(&prompt, self.json_retry_budget)
            .await
        {
            Ok(items) => items,
            Err(RagError::JsonParse { attempts, last_error }) => {
                tracing::warn!(
                    report_id = report_row.id,
                    attempts,
                    error = %last_error,
                    "Idea generation gave no parseable output, persisting nothing"
                );
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let ideas: Vec<NewIdea> = items
            .into_iter()
            .map(|item| NewIdea {
                video_id: video.id,
                title: item.title,
                content: item.description,
                hash_tag: serde_json::to_string(&item.tags).unwrap_or_else(|_| "[]".into()),
            })
            .collect();
        idea::insert_bulk(&self.pool, &ideas).await?;

        tracing::info!(
            report_id = report_row.id,
            ideas = ideas.len(),
            "Idea generation sub-phase done"
        );
        Ok(())
    }
}

/// Poll `report.summary` a few times at one-second intervals. The result is
/// a hint for idea grounding, not a barrier; callers proceed on None.
pub async fn wait_for_summary(pool: &SqlitePool, report_id: i64) -> Option<String> {
    for attempt in 1..=SUMMARY_WAIT_ATTEMPTS {
        match report::get_report(pool, report_id).await {
            Ok(Some(row)) => {
                if let Some(summary) = row.summary
                    && !summary.is_empty()
                {
                    return Some(summary);
                }
            }
            Ok(None) => return None,
            Err(e) => tracing::warn!(report_id, error = %e, "Summary poll failed"),
        }

        if attempt < SUMMARY_WAIT_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(SUMMARY_WAIT_DELAY_SECS)).await;
        }
    }
    None
}

#[async_trait]
impl StepHandler for IdeaHandler {
    fn step(&self) -> Step {
        Step::Idea
    }

    async fn handle(&self, message: &StepMessage) -> Result<StepOutcome, StepError> {
        let Some((report_row, video)) =
            resolve_report_and_video(&self.pool, message.report_id).await?
        else {
            return Ok(StepOutcome::Skipped);
        };

        let Some(channel_row) = channel::get_channel(&self.pool, video.channel_id).await? else {
            tracing::warn!(
                report_id = report_row.id,
                channel_id = video.channel_id,
                "No channel for video, skipping"
            );
            return Ok(StepOutcome::Skipped);
        };

        self.run_trend_subphase(message, &report_row, &channel_row)
            .await?;
        self.run_idea_subphase(message, &report_row, &video, &channel_row)
            .await?;

        Ok(StepOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::constants::DEFAULT_JSON_RETRY_BUDGET;
    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::channel::insert_test_channel;
    use crate::data::sqlite::repositories::report::insert_report;
    use crate::data::sqlite::repositories::video::insert_test_video;
    use crate::data::trends::TrendError;
    use crate::data::types::{
        ChannelStats, FetchedComment, PopularVideo, TrendItem, VideoDetails,
    };
    use crate::data::vector::testing::HashEmbedder;
    use crate::data::vector::{MemoryVectorBackend, VectorStore};
    use crate::data::youtube::YoutubeError;
    use crate::domain::rag::testing::ScriptedChat;

    struct FakeTrends {
        items: Vec<TrendItem>,
    }

    #[async_trait]
    impl TrendFeed for FakeTrends {
        async fn realtime_trends(&self, limit: usize) -> Result<Vec<TrendItem>, TrendError> {
            Ok(self.items.iter().take(limit).cloned().collect())
        }
    }

    struct FakeDataApi;

    #[async_trait]
    impl VideoDataApi for FakeDataApi {
        async fn video_details(&self, _: &str) -> Result<VideoDetails, YoutubeError> {
            Ok(VideoDetails::default())
        }

        async fn channel_stats(&self, _: &str) -> Result<ChannelStats, YoutubeError> {
            Ok(ChannelStats::default())
        }

        async fn comment_threads(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<FetchedComment>, YoutubeError> {
            Ok(vec![])
        }

        async fn category_popular(
            &self,
            _: i64,
            limit: usize,
        ) -> Result<Vec<PopularVideo>, YoutubeError> {
            Ok(vec![
                PopularVideo {
                    title: "viral one-pan dinner".into(),
                    description: "fast cooking".into(),
                    hash_tags: vec!["cooking".into()],
                };
                limit.min(3)
            ])
        }
    }

    async fn setup(pool: &SqlitePool) -> (i64, i64) {
        let channel_id = insert_test_channel(
            pool,
            &ChannelRow {
                id: 0,
                youtube_channel_id: "UC1".into(),
                name: "cooking lab".into(),
                concept: Some("home cooking".into()),
                target: Some("busy office workers".into()),
                channel_hash_tag: Some("#cooking".into()),
            },
        )
        .await;
        let video_id = insert_test_video(
            pool,
            &VideoRow {
                id: 0,
                channel_id,
                youtube_video_id: "yt1".into(),
                video_category: 24,
                title: Some("weeknight curry".into()),
                description: Some("a 20 minute curry".into()),
                view: Some(10_000),
                like_count: Some(300),
                comment_count: Some(41),
            },
        )
        .await;
        let report_id = insert_report(pool, video_id).await.unwrap().id;
        (report_id, video_id)
    }

    fn handler(pool: &SqlitePool, vector: Arc<VectorStore>, chat: Vec<&str>) -> IdeaHandler {
        IdeaHandler::new(
            pool.clone(),
            vector,
            Arc::new(RagExecutor::new(Arc::new(ScriptedChat::new(chat)))),
            Arc::new(FakeDataApi),
            Arc::new(FakeTrends {
                items: vec![TrendItem {
                    keyword: "heat wave".into(),
                    search_volume: 10_000,
                    increase_percentage: 200.0,
                    categories: vec!["Weather".into()],
                    trend_breakdown: vec![],
                }],
            }),
            5,
            DEFAULT_JSON_RETRY_BUDGET,
        )
    }

    fn memory_vector() -> Arc<VectorStore> {
        Arc::new(VectorStore::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::default()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_idea_step() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, video_id) = setup(&pool).await;
        let vector = memory_vector();

        // LLM call order: realtime trends, channel trends, idea generation
        let idea_handler = handler(
            &pool,
            vector.clone(),
            vec![
                r#"{"trends": [{"keyword": "heat wave", "score": 88}]}"#,
                r#"{"trends": [{"keyword": "meal prep", "score": 75}, {"keyword": "no-oven recipes", "score": 70}]}"#,
                r#"[{"title": "cold noodle week", "description": "five no-heat dinners", "tags": ["summer", "cooking"]}]"#,
            ],
        );

        let outcome = idea_handler
            .handle(&StepMessage::new(1, report_id, Step::Idea))
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::Completed);

        // Both keyword sets persisted
        let keywords = trend_keyword::list_by_report(&pool, report_id).await.unwrap();
        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords[0].keyword_type, TrendKeywordType::RealTime);
        assert_eq!(keywords[0].score, 88);
        assert_eq!(keywords[1].keyword_type, TrendKeywordType::Channel);

        // Ideas bulk-inserted with JSON-encoded tags
        let ideas = idea::list_by_video(&pool, video_id).await.unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "cold noodle week");
        assert_eq!(ideas[0].hash_tag, r#"["summer","cooking"]"#);
        assert_eq!(ideas[0].is_book_marked, 0);

        // Popular videos and tailored keywords landed in the vector store
        assert!(
            !vector
                .search_similar_by_embedding(
                    SourceType::IdeaRecommendation,
                    &vector.generate_embedding("viral one-pan dinner").await.unwrap(),
                    Some(video_id),
                    5,
                )
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_vector_save_keeps_sql_writes_only() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, video_id) = setup(&pool).await;
        let vector = memory_vector();

        let idea_handler = handler(
            &pool,
            vector.clone(),
            vec![
                r#"{"trends": [{"keyword": "heat wave", "score": 88}]}"#,
                r#"{"trends": [{"keyword": "meal prep", "score": 75}]}"#,
                r#"[{"title": "t", "description": "d", "tags": []}]"#,
            ],
        );

        let mut message = StepMessage::new(1, report_id, Step::Idea);
        message.skip_vector_save = Some(true);
        let outcome = idea_handler.handle(&message).await.unwrap();
        assert_eq!(outcome, StepOutcome::Completed);

        assert_eq!(
            trend_keyword::list_by_report(&pool, report_id).await.unwrap().len(),
            2
        );
        assert_eq!(idea::list_by_video(&pool, video_id).await.unwrap().len(), 1);

        // No vector writes happened
        let hits = vector
            .search_similar("anything", SourceType::IdeaRecommendation, None, &[], 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
        let hits = vector
            .search_similar("anything", SourceType::PersonalizedKeywords, None, &[], 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idea_parse_exhaustion_inserts_nothing() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, video_id) = setup(&pool).await;

        let idea_handler = handler(
            &pool,
            memory_vector(),
            vec![
                r#"{"trends": []}"#,
                r#"{"trends": []}"#,
                "never json",
            ],
        );

        let outcome = idea_handler
            .handle(&StepMessage::new(1, report_id, Step::Idea))
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::Completed);
        assert!(idea::list_by_video(&pool, video_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_summary_returns_present_summary() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, _) = setup(&pool).await;

        report::update_report(
            &pool,
            report_id,
            &crate::data::types::ReportPatch {
                summary: Some("already summarized".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let summary = wait_for_summary(&pool, report_id).await;
        assert_eq!(summary.as_deref(), Some("already summarized"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_summary_gives_up() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, _) = setup(&pool).await;
        assert!(wait_for_summary(&pool, report_id).await.is_none());
    }
}
