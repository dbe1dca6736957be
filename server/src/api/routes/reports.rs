//! Report creation endpoints
//!
//! `POST /api/v1/reports?video_id=` allocates the report and task rows and
//! publishes the three step messages. `POST /api/v1/reports/v2` routes to
//! the `-v2` topic family with `skip_vector_save=true`; unless configured
//! otherwise the idea axis is pre-marked COMPLETED and no idea message is
//! published. The caller polls the task for completion - the endpoint never
//! waits on the pipeline.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::core::config::TopicsConfig;
use crate::data::DataError;
use crate::data::sqlite::repositories::{comment, idea, report, task, trend_keyword};
use crate::data::types::{CommentRow, IdeaRow, ReportRow, StepStatus, TrendKeywordRow};
use crate::domain::report::{Step, StepMessage};

#[derive(Deserialize)]
pub struct CreateReportQuery {
    pub video_id: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportBody {
    pub google_access_token: Option<String>,
}

#[derive(Serialize)]
pub struct CreateReportResponse {
    pub task_id: i64,
}

#[derive(Serialize)]
pub struct ReportDetailResponse {
    #[serde(flatten)]
    pub report: ReportRow,
    pub comments: Vec<CommentRow>,
    pub trend_keywords: Vec<TrendKeywordRow>,
    pub ideas: Vec<IdeaRow>,
}

/// Errors surfaced by the report endpoints
pub enum ApiError {
    Database(DataError),
    Publish(String),
}

impl From<DataError> for ApiError {
    fn from(e: DataError) -> Self {
        Self::Database(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Report endpoint database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database error".to_string())
            }
            Self::Publish(e) => {
                tracing::error!(error = %e, "Report endpoint publish error");
                (StatusCode::BAD_GATEWAY, "message publish failed".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// `POST /api/v1/reports`
pub async fn create_report(
    State(state): State<ApiState>,
    Query(query): Query<CreateReportQuery>,
    body: Option<Json<CreateReportBody>>,
) -> Result<Json<CreateReportResponse>, ApiError> {
    create(state, query.video_id, body.map(|b| b.0).unwrap_or_default(), false).await
}

/// `POST /api/v1/reports/v2`
pub async fn create_report_v2(
    State(state): State<ApiState>,
    Query(query): Query<CreateReportQuery>,
    body: Option<Json<CreateReportBody>>,
) -> Result<Json<CreateReportResponse>, ApiError> {
    create(state, query.video_id, body.map(|b| b.0).unwrap_or_default(), true).await
}

/// `GET /api/v1/reports/{id}` - the assembled report with its comment
/// summaries, trend keywords and ideas. Fields a step has not written yet
/// are null; poll the task to see which axes are done.
pub async fn get_report(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(report_row) = report::get_report(&state.pool, id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "report not found" })),
        )
            .into_response());
    };

    let comments = comment::list_by_report(&state.pool, id).await?;
    let trend_keywords = trend_keyword::list_by_report(&state.pool, id).await?;
    let ideas = idea::list_by_video(&state.pool, report_row.video_id).await?;

    Ok(Json(ReportDetailResponse {
        report: report_row,
        comments,
        trend_keywords,
        ideas,
    })
    .into_response())
}

async fn create(
    state: ApiState,
    video_id: i64,
    body: CreateReportBody,
    v2: bool,
) -> Result<Json<CreateReportResponse>, ApiError> {
    let report_row = report::insert_report(&state.pool, video_id).await?;

    let publish_idea = !v2 || state.v2_idea_enabled;
    let initial_idea_status = if publish_idea {
        StepStatus::Pending
    } else {
        StepStatus::Completed
    };
    let task_row = task::insert_task(&state.pool, report_row.id, initial_idea_status).await?;

    tracing::info!(
        report_id = report_row.id,
        task_id = task_row.id,
        video_id,
        v2,
        "Report created, dispatching steps"
    );

    let mut steps = vec![
        (state.topics.overview_topic.clone(), Step::Overview),
        (state.topics.analysis_topic.clone(), Step::Analysis),
    ];
    if publish_idea {
        steps.push((state.topics.idea_topic.clone(), Step::Idea));
    }

    for (base_topic, step) in steps {
        let topic_name = if v2 {
            TopicsConfig::v2_topic(&base_topic)
        } else {
            base_topic
        };

        let mut message = StepMessage::new(task_row.id, report_row.id, step);
        message.google_access_token = body.google_access_token.clone();
        if v2 {
            message.skip_vector_save = Some(true);
        }

        state
            .producer
            .publish(&topic_name, &message)
            .await
            .map_err(|e| ApiError::Publish(e.to_string()))?;
    }

    Ok(Json(CreateReportResponse {
        task_id: task_row.id,
    }))
}
