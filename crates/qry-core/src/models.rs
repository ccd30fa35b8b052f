//! Domain models for the shared ecosystem store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::payload::{InsightPayload, MessagePayload};

/// Generates a closed vocabulary enum with string conversions that reject
/// anything outside the list.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every member of the vocabulary, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => {
                        let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        Err(Error::Validation(format!(
                            concat!("unknown ", $what, ": {} (valid: {})"),
                            other,
                            valid.join(", ")
                        )))
                    }
                }
            }
        }
    };
}

vocabulary! {
    /// Known participants of the ecosystem.
    ToolName, "tool name" {
        Wherewasi => "wherewasi",
        Uroboro => "uroboro",
        Examinator => "examinator",
        QryAi => "qryai",
        Doggowoof => "doggowoof",
        Qomoboro => "qomoboro",
    }
}

vocabulary! {
    /// Message types for cross-tool communication.
    MessageType, "message type" {
        Capture => "capture",
        ContextUpdate => "context_update",
        FlashcardRequest => "flashcard_request",
        StudySession => "study_session",
        ProjectActivity => "project_activity",
        Insight => "insight",
        Alert => "alert",
        PomodoroComplete => "pomodoro_complete",
    }
}

vocabulary! {
    /// Kinds of derived cross-tool recommendations.
    InsightType, "insight type" {
        StudyRecommendation => "study_recommendation",
        ContentSynthesis => "content_synthesis",
        ProductivityPattern => "productivity_pattern",
        ProjectConnection => "project_connection",
        TimeOptimization => "time_optimization",
    }
}

/// A project tracked across the ecosystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub path: Option<String>,
    pub git_repo: bool,
    pub last_activity: Option<DateTime<Utc>>,
    pub primary_tool: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A queued cross-tool message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMessage {
    pub id: i64,
    pub from_tool: String,
    pub to_tool: String,
    pub message_type: String,
    pub data: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ToolMessage {
    /// Decode the payload according to the message's type tag.
    pub fn payload(&self) -> Result<MessagePayload> {
        let message_type = self.message_type.parse::<MessageType>()?;
        MessagePayload::parse(message_type, &self.data)
    }
}

/// One command invocation, as recorded for usage analytics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageEvent {
    pub tool: String,
    pub command: String,
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub duration_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
}

/// A persisted usage record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStat {
    pub id: i64,
    pub tool: String,
    pub command: String,
    pub project: Option<String>,
    pub duration_ms: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an insight.
#[derive(Debug, Clone)]
pub struct NewInsight {
    pub source_tool: ToolName,
    pub target_tool: Option<ToolName>,
    pub project: Option<String>,
    pub confidence: f64,
    pub payload: InsightPayload,
}

/// A derived recommendation produced by one tool for another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemInsight {
    pub id: i64,
    pub insight_type: String,
    pub source_tool: String,
    pub target_tool: Option<String>,
    pub project: Option<String>,
    pub confidence: f64,
    pub data: String,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl EcosystemInsight {
    pub fn payload(&self) -> Result<InsightPayload> {
        let insight_type = self.insight_type.parse::<InsightType>()?;
        InsightPayload::parse(insight_type, &self.data)
    }
}

/// A row of the migrations ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub version: i64,
    pub tool: String,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
