//! Tool message rows. The queue semantics live in [`crate::messaging`].

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{Database, format_timestamp, get_optional_timestamp, get_timestamp, now};
use crate::error::{OperationContext, Result};
use crate::models::{MessageType, ToolMessage, ToolName};

impl Database {
    /// Insert an already validated message.
    pub(crate) async fn insert_tool_message(
        &self,
        from: ToolName,
        to: ToolName,
        message_type: MessageType,
        data: &str,
    ) -> Result<i64> {
        self.execute_returning_id(
            sqlx::query(
                r#"
                INSERT INTO tool_messages (from_tool, to_tool, message_type, data, processed, created_at)
                VALUES (?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(message_type.as_str())
            .bind(data)
            .bind(format_timestamp(now())),
        )
        .await
        .op("failed to send tool message")
    }

    /// Unprocessed messages for `to_tool`, oldest first.
    pub(crate) async fn unprocessed_messages(&self, to_tool: &str) -> Result<Vec<ToolMessage>> {
        let rows = self
            .fetch_all(
                sqlx::query(
                    r#"
                    SELECT * FROM tool_messages
                    WHERE to_tool = ? AND processed = 0
                    ORDER BY julianday(created_at) ASC, id ASC
                    "#,
                )
                .bind(to_tool),
            )
            .await
            .op("failed to query tool messages")?;

        rows.iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query tool messages")
    }

    /// Flag a message as processed. Returns false when no such message exists.
    ///
    /// A repeat keeps the first processed timestamp.
    pub(crate) async fn set_message_processed(&self, id: i64) -> Result<bool> {
        let affected = self
            .execute(
                sqlx::query(
                    r#"
                    UPDATE tool_messages
                    SET processed = 1, processed_at = COALESCE(processed_at, ?)
                    WHERE id = ?
                    "#,
                )
                .bind(format_timestamp(now()))
                .bind(id),
            )
            .await
            .op("failed to mark tool message as processed")?;
        Ok(affected > 0)
    }

    /// Get a message by ID, processed or not.
    pub async fn get_tool_message(&self, id: i64) -> Result<Option<ToolMessage>> {
        let row = self
            .fetch_optional(sqlx::query("SELECT * FROM tool_messages WHERE id = ?").bind(id))
            .await
            .op("failed to get tool message")?;

        row.as_ref()
            .map(message_from_row)
            .transpose()
            .op("failed to get tool message")
    }
}

fn message_from_row(row: &SqliteRow) -> Result<ToolMessage> {
    Ok(ToolMessage {
        id: row.try_get("id")?,
        from_tool: row.try_get("from_tool")?,
        to_tool: row.try_get("to_tool")?,
        message_type: row.try_get("message_type")?,
        data: row.try_get("data")?,
        processed: row.try_get::<Option<bool>, _>("processed")?.unwrap_or(false),
        created_at: get_timestamp(row, "created_at")?,
        processed_at: get_optional_timestamp(row, "processed_at")?,
    })
}
