//! Trend keyword repository (insert-only)

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::{NewTrendKeyword, TrendKeywordRow, TrendKeywordType};

/// Bulk-insert trend keywords; scores are clamped to [0, 100]
pub async fn insert_bulk(
    pool: &SqlitePool,
    keywords: &[NewTrendKeyword],
) -> Result<(), DataError> {
    if keywords.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for keyword in keywords {
        sqlx::query(
            "INSERT INTO trend_keyword (report_id, keyword_type, keyword, score, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(keyword.report_id)
        .bind(keyword.keyword_type.as_str())
        .bind(&keyword.keyword)
        .bind(keyword.score.clamp(0, 100))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Trend keywords recorded for a report
pub async fn list_by_report(
    pool: &SqlitePool,
    report_id: i64,
) -> Result<Vec<TrendKeywordRow>, DataError> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String, i64)>(
        "SELECT id, report_id, keyword_type, keyword, score \
         FROM trend_keyword WHERE report_id = ? ORDER BY id",
    )
    .bind(report_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, report_id, keyword_type, keyword, score)| {
            let keyword_type = TrendKeywordType::parse(&keyword_type).ok_or_else(|| {
                DataError::Config(format!("invalid trend keyword type: {keyword_type}"))
            })?;
            Ok(TrendKeywordRow {
                id,
                report_id,
                keyword_type,
                keyword,
                score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::report::insert_report;

    #[tokio::test]
    async fn test_insert_bulk_clamps_scores() {
        let pool = init_memory_pool().await.unwrap();
        let report = insert_report(&pool, 1).await.unwrap();

        insert_bulk(
            &pool,
            &[
                NewTrendKeyword {
                    report_id: report.id,
                    keyword_type: TrendKeywordType::RealTime,
                    keyword: "heat wave".into(),
                    score: 250,
                },
                NewTrendKeyword {
                    report_id: report.id,
                    keyword_type: TrendKeywordType::Channel,
                    keyword: "meal prep".into(),
                    score: -5,
                },
            ],
        )
        .await
        .unwrap();

        let rows = list_by_report(&pool, report.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, 100);
        assert_eq!(rows[0].keyword_type, TrendKeywordType::RealTime);
        assert_eq!(rows[1].score, 0);
        assert_eq!(rows[1].keyword_type, TrendKeywordType::Channel);
    }
}
