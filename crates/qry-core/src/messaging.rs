//! Cross-tool asynchronous messaging.
//!
//! The `tool_messages` table is the queue: a message is delivered while it is
//! unprocessed and leaves the queue once its receiver marks it. Nothing stops
//! two drains from seeing the same row before it is marked, so delivery is
//! at-least-once and receivers must tolerate repeats.

use crate::db::Database;
use crate::error::{Error, OperationContext, Result};
use crate::models::{MessageType, ToolMessage, ToolName};
use crate::payload::MessagePayload;

/// Sends, drains and acknowledges messages on a store.
#[derive(Clone, Copy)]
pub struct Messenger<'a> {
    db: &'a Database,
}

impl<'a> Messenger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Validate and enqueue a message from raw wire values.
    ///
    /// Nothing is written unless both tool names, the message type and the
    /// payload shape are valid.
    pub async fn send(
        &self,
        from_tool: &str,
        to_tool: &str,
        message_type: &str,
        payload: &str,
    ) -> Result<i64> {
        let (from, to, message_type) =
            validate(from_tool, to_tool, message_type, payload).op("failed to send tool message")?;
        let id = self
            .db
            .insert_tool_message(from, to, message_type, payload)
            .await?;
        tracing::debug!(id, %from, %to, %message_type, "queued tool message");
        Ok(id)
    }

    /// Enqueue a typed payload; the message type follows from the payload.
    pub async fn send_payload(
        &self,
        from: ToolName,
        to: ToolName,
        payload: &MessagePayload,
    ) -> Result<i64> {
        let data = payload.to_json().op("failed to send tool message")?;
        let message_type = payload.message_type();
        let id = self
            .db
            .insert_tool_message(from, to, message_type, &data)
            .await?;
        tracing::debug!(id, %from, %to, %message_type, "queued tool message");
        Ok(id)
    }

    /// Every unprocessed message addressed to `to_tool`, oldest first.
    pub async fn drain(&self, to_tool: &str) -> Result<Vec<ToolMessage>> {
        to_tool
            .parse::<ToolName>()
            .op("failed to query tool messages")?;
        self.db.unprocessed_messages(to_tool).await
    }

    /// Mark a message processed. Marking twice, or marking an id that does not
    /// exist, is not an error.
    pub async fn mark_processed(&self, id: i64) -> Result<()> {
        if !self.db.set_message_processed(id).await? {
            tracing::warn!(id, "no tool message to mark as processed");
        }
        Ok(())
    }
}

fn validate(
    from_tool: &str,
    to_tool: &str,
    message_type: &str,
    payload: &str,
) -> Result<(ToolName, ToolName, MessageType)> {
    let from = from_tool
        .parse::<ToolName>()
        .map_err(|e| Error::Validation(format!("invalid from_tool: {}", inner(&e))))?;
    let to = to_tool
        .parse::<ToolName>()
        .map_err(|e| Error::Validation(format!("invalid to_tool: {}", inner(&e))))?;
    let message_type = message_type
        .parse::<MessageType>()
        .map_err(|e| Error::Validation(format!("invalid message_type: {}", inner(&e))))?;
    MessagePayload::parse(message_type, payload)?;
    Ok((from, to, message_type))
}

fn inner(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_known_values() {
        let (from, to, kind) = validate("uroboro", "wherewasi", "alert", "{}").expect("valid");
        assert_eq!(from, ToolName::Uroboro);
        assert_eq!(to, ToolName::Wherewasi);
        assert_eq!(kind, MessageType::Alert);
    }

    #[test]
    fn validate_names_the_bad_field() {
        let err = validate("uroboro", "nobody", "alert", "{}").expect_err("should fail");
        assert!(err.to_string().contains("invalid to_tool: unknown tool name: nobody"));

        let err = validate("uroboro", "wherewasi", "gossip", "{}").expect_err("should fail");
        assert!(err.to_string().contains("invalid message_type"));
    }

    #[test]
    fn validate_rejects_empty_payload() {
        let err = validate("uroboro", "wherewasi", "alert", "").expect_err("should fail");
        assert!(err.is_validation());
    }
}
