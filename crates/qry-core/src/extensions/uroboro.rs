//! uroboro: content captures and publications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::{self, Database, get_timestamp};
use crate::error::{Error, OperationContext, Result};
use crate::migrate::Extension;
use crate::models::ToolName;
use crate::schema::now_default;

pub const EXTENSION: Extension = Extension {
    tool: "uroboro",
    version: 3,
    description: "Uroboro captures and publications with context linking",
    schema: SCHEMA,
    depends_on: &["wherewasi"],
};

const SCHEMA: &str = concat!(
    r#"
CREATE TABLE IF NOT EXISTS captures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    content TEXT NOT NULL,
    project TEXT,
    tags TEXT,
    source_tool TEXT NOT NULL DEFAULT 'uroboro',
    metadata TEXT,
    context_session_id INTEGER REFERENCES context_sessions(id),
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    updated_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

CREATE TABLE IF NOT EXISTS publications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    format TEXT NOT NULL,
    type TEXT NOT NULL,
    source_captures TEXT,
    project TEXT,
    target_path TEXT,
    context_session_id INTEGER REFERENCES context_sessions(id),
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

CREATE INDEX IF NOT EXISTS idx_captures_timestamp ON captures(timestamp);
CREATE INDEX IF NOT EXISTS idx_captures_project ON captures(project);
CREATE INDEX IF NOT EXISTS idx_captures_source_tool ON captures(source_tool);
CREATE INDEX IF NOT EXISTS idx_captures_context_session ON captures(context_session_id);
CREATE INDEX IF NOT EXISTS idx_publications_type ON publications(type);
CREATE INDEX IF NOT EXISTS idx_publications_project ON publications(project);
CREATE INDEX IF NOT EXISTS idx_publications_context_session ON publications(context_session_id);
"#
);

/// A captured piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub project: Option<String>,
    pub tags: Option<String>,
    pub source_tool: String,
    pub metadata: Option<serde_json::Value>,
    pub context_session_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Database::save_capture`].
#[derive(Debug, Clone)]
pub struct NewCapture {
    pub content: String,
    pub project: Option<String>,
    pub tags: Option<String>,
    pub source_tool: ToolName,
    pub metadata: Option<serde_json::Value>,
    pub context_session_id: Option<i64>,
}

impl NewCapture {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            project: None,
            tags: None,
            source_tool: ToolName::Uroboro,
            metadata: None,
            context_session_id: None,
        }
    }
}

impl Database {
    pub async fn save_capture(&self, capture: NewCapture) -> Result<Capture> {
        if capture.content.trim().is_empty() {
            return Err(Error::Validation("capture content cannot be empty".to_string()))
                .op("failed to save capture");
        }

        let now = db::now();
        let stamp = db::format_timestamp(now);
        let metadata = capture
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .op("failed to save capture")?;

        let id = self
            .execute_returning_id(
                sqlx::query(
                    r#"
                    INSERT INTO captures
                        (timestamp, content, project, tags, source_tool, metadata, context_session_id, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&stamp)
                .bind(&capture.content)
                .bind(&capture.project)
                .bind(&capture.tags)
                .bind(capture.source_tool.as_str())
                .bind(metadata)
                .bind(capture.context_session_id)
                .bind(&stamp)
                .bind(&stamp),
            )
            .await
            .op("failed to save capture")?;

        Ok(Capture {
            id,
            timestamp: now,
            content: capture.content,
            project: capture.project,
            tags: capture.tags,
            source_tool: capture.source_tool.to_string(),
            metadata: capture.metadata,
            context_session_id: capture.context_session_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Newest captures, optionally restricted to one project.
    pub async fn recent_captures(&self, project: Option<&str>, limit: i64) -> Result<Vec<Capture>> {
        let mut sql = String::from(
            "SELECT id, timestamp, content, project, tags, source_tool, metadata, context_session_id, created_at, updated_at FROM captures",
        );
        if project.is_some() {
            sql.push_str(" WHERE project = ?");
        }
        sql.push_str(" ORDER BY julianday(timestamp) DESC, id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(project) = project {
            query = query.bind(project);
        }
        query = query.bind(limit.max(0));

        let rows = self
            .fetch_all(query)
            .await
            .op("failed to query recent captures")?;

        rows.iter()
            .map(capture_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query recent captures")
    }
}

fn capture_from_row(row: &SqliteRow) -> Result<Capture> {
    Ok(Capture {
        id: row.try_get("id")?,
        timestamp: get_timestamp(row, "timestamp")?,
        content: row.try_get("content")?,
        project: row.try_get("project")?,
        tags: row.try_get("tags")?,
        source_tool: row.try_get("source_tool")?,
        metadata: row
            .try_get::<Option<String>, _>("metadata")?
            .map(|s| serde_json::from_str(&s))
            .transpose()?,
        context_session_id: row.try_get("context_session_id")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}
