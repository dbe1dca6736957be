//! Task repository
//!
//! Tasks parallel reports 1:1 and track three status axes. Each axis is
//! written by exactly one step handler, so per-column updates are safe under
//! concurrent workers.

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::{StepStatus, TaskAxis, TaskRow};

/// Insert a task for a report. Overview and analysis always start PENDING;
/// the idea axis can be pre-marked (v2 requests skip idea generation).
pub async fn insert_task(
    pool: &SqlitePool,
    report_id: i64,
    idea_status: StepStatus,
) -> Result<TaskRow, DataError> {
    let result = sqlx::query(
        "INSERT INTO task (report_id, overview_status, analysis_status, idea_status) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(report_id)
    .bind(StepStatus::Pending.as_str())
    .bind(StepStatus::Pending.as_str())
    .bind(idea_status.as_str())
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_task(pool, id)
        .await?
        .ok_or_else(|| DataError::not_found("task", id))
}

/// Get a task by id
pub async fn get_task(pool: &SqlitePool, id: i64) -> Result<Option<TaskRow>, DataError> {
    let row = sqlx::query_as::<_, (i64, i64, String, String, String)>(
        "SELECT id, report_id, overview_status, analysis_status, idea_status \
         FROM task WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(map_task).transpose()
}

/// Write one axis of the task state machine
pub async fn set_axis_status(
    pool: &SqlitePool,
    task_id: i64,
    axis: TaskAxis,
    status: StepStatus,
) -> Result<bool, DataError> {
    let sql = match axis {
        TaskAxis::Overview => "UPDATE task SET overview_status = ? WHERE id = ?",
        TaskAxis::Analysis => "UPDATE task SET analysis_status = ? WHERE id = ?",
        TaskAxis::Idea => "UPDATE task SET idea_status = ? WHERE id = ?",
    };

    let result = sqlx::query(sql)
        .bind(status.as_str())
        .bind(task_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn map_task(
    (id, report_id, overview, analysis, idea): (i64, i64, String, String, String),
) -> Result<TaskRow, DataError> {
    let parse = |axis: &'static str, s: String| {
        StepStatus::parse(&s)
            .ok_or_else(|| DataError::Config(format!("invalid {axis} status: {s}")))
    };

    Ok(TaskRow {
        id,
        report_id,
        overview_status: parse("overview", overview)?,
        analysis_status: parse("analysis", analysis)?,
        idea_status: parse("idea", idea)?,
    })
}
