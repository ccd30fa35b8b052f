//! Derived cross-tool recommendations.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{Database, format_timestamp, get_optional_timestamp, get_timestamp, now};
use crate::error::{Error, OperationContext, Result};
use crate::models::{EcosystemInsight, NewInsight, ToolName};

impl Database {
    /// Record an insight, unapplied.
    pub async fn record_insight(&self, insight: &NewInsight) -> Result<i64> {
        if !(0.0..=1.0).contains(&insight.confidence) {
            return Err(Error::Validation(format!(
                "insight confidence must be within [0, 1], got {}",
                insight.confidence
            )))
            .op("failed to record insight");
        }
        let data = insight.payload.to_json().op("failed to record insight")?;

        self.execute_returning_id(
            sqlx::query(
                r#"
                INSERT INTO ecosystem_insights
                    (insight_type, source_tool, target_tool, project, confidence, data, applied, created_at)
                VALUES (?, ?, ?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(insight.payload.insight_type().as_str())
            .bind(insight.source_tool.as_str())
            .bind(insight.target_tool.map(ToolName::as_str))
            .bind(&insight.project)
            .bind(insight.confidence)
            .bind(data)
            .bind(format_timestamp(now())),
        )
        .await
        .op("failed to record insight")
    }

    /// Unapplied insights aimed at `target` or at nobody in particular,
    /// most confident first.
    pub async fn pending_insights(&self, target: ToolName) -> Result<Vec<EcosystemInsight>> {
        let rows = self
            .fetch_all(
                sqlx::query(
                    r#"
                    SELECT * FROM ecosystem_insights
                    WHERE applied = 0 AND (target_tool = ? OR target_tool IS NULL)
                    ORDER BY confidence DESC, julianday(created_at) ASC, id ASC
                    "#,
                )
                .bind(target.as_str()),
            )
            .await
            .op("failed to query insights")?;

        rows.iter()
            .map(insight_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query insights")
    }

    /// Flag an insight as applied. Repeating this is a no-op.
    pub async fn mark_insight_applied(&self, id: i64) -> Result<()> {
        let affected = self
            .execute(
                sqlx::query(
                    r#"
                    UPDATE ecosystem_insights
                    SET applied = 1, applied_at = COALESCE(applied_at, ?)
                    WHERE id = ?
                    "#,
                )
                .bind(format_timestamp(now()))
                .bind(id),
            )
            .await
            .op("failed to mark insight as applied")?;

        if affected == 0 {
            tracing::warn!(id, "no insight to mark as applied");
        }
        Ok(())
    }
}

fn insight_from_row(row: &SqliteRow) -> Result<EcosystemInsight> {
    Ok(EcosystemInsight {
        id: row.try_get("id")?,
        insight_type: row.try_get("insight_type")?,
        source_tool: row.try_get("source_tool")?,
        target_tool: row.try_get("target_tool")?,
        project: row.try_get("project")?,
        confidence: row.try_get::<Option<f64>, _>("confidence")?.unwrap_or(0.0),
        data: row.try_get("data")?,
        applied: row.try_get::<Option<bool>, _>("applied")?.unwrap_or(false),
        created_at: get_timestamp(row, "created_at")?,
        applied_at: get_optional_timestamp(row, "applied_at")?,
    })
}
