//! Task polling endpoint

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::api::ApiState;
use crate::data::sqlite::repositories::task;
use crate::data::types::StepStatus;

#[derive(Serialize)]
pub struct TaskResponse {
    pub task_id: i64,
    pub report_id: i64,
    pub overview_status: StepStatus,
    pub analysis_status: StepStatus,
    pub idea_status: StepStatus,
}

/// `GET /api/v1/tasks/{id}` - clients poll this until every axis leaves
/// PENDING
pub async fn get_task(State(state): State<ApiState>, Path(id): Path<i64>) -> Response {
    match task::get_task(&state.pool, id).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            Json(TaskResponse {
                task_id: row.id,
                report_id: row.report_id,
                overview_status: row.overview_status,
                analysis_status: row.analysis_status,
                idea_status: row.idea_status,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "task not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(task_id = id, error = %e, "Task lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "database error" })),
            )
                .into_response()
        }
    }
}
