//! Usage telemetry. Write-only from the tools' point of view; aggregation is
//! left to readers.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{Database, format_timestamp, get_timestamp, now};
use crate::error::{OperationContext, Result};
use crate::models::{UsageEvent, UsageStat};

impl Database {
    /// Record one command invocation.
    pub async fn track_usage(&self, event: &UsageEvent) -> Result<()> {
        self.execute(
            sqlx::query(
                r#"
                INSERT INTO usage_stats (tool, command, project, session_id, duration_ms, success, error_message, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&event.tool)
            .bind(&event.command)
            .bind(&event.project)
            .bind(&event.session_id)
            .bind(event.duration_ms)
            .bind(event.success)
            .bind(&event.error_message)
            .bind(format_timestamp(now())),
        )
        .await
        .op("failed to track usage")?;
        Ok(())
    }

    /// Latest usage records for one tool, newest first.
    pub async fn recent_usage(&self, tool: &str, limit: i64) -> Result<Vec<UsageStat>> {
        let rows = self
            .fetch_all(
                sqlx::query(
                    "SELECT * FROM usage_stats WHERE tool = ? ORDER BY julianday(created_at) DESC, id DESC LIMIT ?",
                )
                .bind(tool)
                .bind(limit.max(0)),
            )
            .await
            .op("failed to query usage")?;

        rows.iter()
            .map(usage_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query usage")
    }
}

fn usage_from_row(row: &SqliteRow) -> Result<UsageStat> {
    Ok(UsageStat {
        id: row.try_get("id")?,
        tool: row.try_get("tool")?,
        command: row.try_get("command")?,
        project: row.try_get("project")?,
        duration_ms: row.try_get("duration_ms")?,
        success: row.try_get::<Option<bool>, _>("success")?.unwrap_or(true),
        error_message: row.try_get("error_message")?,
        session_id: row.try_get("session_id")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}
