//! Typed payloads carried by tool messages and insights.
//!
//! Both are stored as opaque JSON text, but every payload is validated against
//! the shape implied by its type tag before it is written.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{InsightType, MessageType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureData {
    pub content: String,
    pub project: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextUpdateData {
    pub project: String,
    pub context_data: String,
    #[serde(default)]
    pub session_info: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardRequestData {
    pub project: String,
    #[serde(default)]
    pub source_capture_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_session_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySessionData {
    pub project: String,
    pub flashcards_reviewed: i32,
    pub correct_answers: i32,
    pub duration_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_session_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectActivityData {
    pub project: String,
    pub activity: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightNoticeData {
    pub insight_type: InsightType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroCompleteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub duration_minutes: i32,
}

fn default_difficulty() -> i32 {
    1
}

/// Payload of a tool message, one shape per [`MessageType`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Capture(CaptureData),
    ContextUpdate(ContextUpdateData),
    FlashcardRequest(FlashcardRequestData),
    StudySession(StudySessionData),
    ProjectActivity(ProjectActivityData),
    Insight(InsightNoticeData),
    Alert(AlertData),
    PomodoroComplete(PomodoroCompleteData),
}

impl MessagePayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::Capture(_) => MessageType::Capture,
            MessagePayload::ContextUpdate(_) => MessageType::ContextUpdate,
            MessagePayload::FlashcardRequest(_) => MessageType::FlashcardRequest,
            MessagePayload::StudySession(_) => MessageType::StudySession,
            MessagePayload::ProjectActivity(_) => MessageType::ProjectActivity,
            MessagePayload::Insight(_) => MessageType::Insight,
            MessagePayload::Alert(_) => MessageType::Alert,
            MessagePayload::PomodoroComplete(_) => MessageType::PomodoroComplete,
        }
    }

    /// Parse raw JSON into the shape required by `message_type`.
    pub fn parse(message_type: MessageType, raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::Validation("message data cannot be empty".to_string()));
        }
        let payload = match message_type {
            MessageType::Capture => MessagePayload::Capture(decode(message_type, raw)?),
            MessageType::ContextUpdate => {
                MessagePayload::ContextUpdate(decode(message_type, raw)?)
            }
            MessageType::FlashcardRequest => {
                MessagePayload::FlashcardRequest(decode(message_type, raw)?)
            }
            MessageType::StudySession => MessagePayload::StudySession(decode(message_type, raw)?),
            MessageType::ProjectActivity => {
                MessagePayload::ProjectActivity(decode(message_type, raw)?)
            }
            MessageType::Insight => MessagePayload::Insight(decode(message_type, raw)?),
            MessageType::Alert => MessagePayload::Alert(decode(message_type, raw)?),
            MessageType::PomodoroComplete => {
                MessagePayload::PomodoroComplete(decode(message_type, raw)?)
            }
        };
        Ok(payload)
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            MessagePayload::Capture(data) => serde_json::to_string(data)?,
            MessagePayload::ContextUpdate(data) => serde_json::to_string(data)?,
            MessagePayload::FlashcardRequest(data) => serde_json::to_string(data)?,
            MessagePayload::StudySession(data) => serde_json::to_string(data)?,
            MessagePayload::ProjectActivity(data) => serde_json::to_string(data)?,
            MessagePayload::Insight(data) => serde_json::to_string(data)?,
            MessagePayload::Alert(data) => serde_json::to_string(data)?,
            MessagePayload::PomodoroComplete(data) => serde_json::to_string(data)?,
        };
        Ok(json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecommendationData {
    pub topic: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub flashcard_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSynthesisData {
    pub summary: String,
    #[serde(default)]
    pub capture_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityPatternData {
    pub pattern: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConnectionData {
    pub related_projects: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOptimizationData {
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes_saved: Option<i64>,
}

/// Payload of an ecosystem insight, one shape per [`InsightType`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsightPayload {
    StudyRecommendation(StudyRecommendationData),
    ContentSynthesis(ContentSynthesisData),
    ProductivityPattern(ProductivityPatternData),
    ProjectConnection(ProjectConnectionData),
    TimeOptimization(TimeOptimizationData),
}

impl InsightPayload {
    pub fn insight_type(&self) -> InsightType {
        match self {
            InsightPayload::StudyRecommendation(_) => InsightType::StudyRecommendation,
            InsightPayload::ContentSynthesis(_) => InsightType::ContentSynthesis,
            InsightPayload::ProductivityPattern(_) => InsightType::ProductivityPattern,
            InsightPayload::ProjectConnection(_) => InsightType::ProjectConnection,
            InsightPayload::TimeOptimization(_) => InsightType::TimeOptimization,
        }
    }

    pub fn parse(insight_type: InsightType, raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::Validation("insight data cannot be empty".to_string()));
        }
        let payload = match insight_type {
            InsightType::StudyRecommendation => {
                InsightPayload::StudyRecommendation(decode(insight_type, raw)?)
            }
            InsightType::ContentSynthesis => {
                InsightPayload::ContentSynthesis(decode(insight_type, raw)?)
            }
            InsightType::ProductivityPattern => {
                InsightPayload::ProductivityPattern(decode(insight_type, raw)?)
            }
            InsightType::ProjectConnection => {
                InsightPayload::ProjectConnection(decode(insight_type, raw)?)
            }
            InsightType::TimeOptimization => {
                InsightPayload::TimeOptimization(decode(insight_type, raw)?)
            }
        };
        Ok(payload)
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            InsightPayload::StudyRecommendation(data) => serde_json::to_string(data)?,
            InsightPayload::ContentSynthesis(data) => serde_json::to_string(data)?,
            InsightPayload::ProductivityPattern(data) => serde_json::to_string(data)?,
            InsightPayload::ProjectConnection(data) => serde_json::to_string(data)?,
            InsightPayload::TimeOptimization(data) => serde_json::to_string(data)?,
        };
        Ok(json)
    }
}

fn decode<T, K>(kind: K, raw: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    K: std::fmt::Display,
{
    serde_json::from_str(raw)
        .map_err(|e| Error::Validation(format!("invalid {kind} payload: {e}")))
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
