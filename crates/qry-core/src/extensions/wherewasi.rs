//! wherewasi: context sessions.
//!
//! The context text itself comes from a [`ContextGenerator`] supplied by the
//! tool; this module only persists and retrieves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::{self, Database, get_timestamp};
use crate::error::{OperationContext, Result};
use crate::migrate::Extension;
use crate::schema::now_default;

/// Upper bound on keyword search results.
pub const SEARCH_LIMIT: i64 = 10;

pub const EXTENSION: Extension = Extension {
    tool: "wherewasi",
    version: 2,
    description: "Wherewasi context sessions",
    schema: SCHEMA,
    depends_on: &[],
};

const SCHEMA: &str = concat!(
    r#"
CREATE TABLE IF NOT EXISTS context_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    timestamp TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    context_data TEXT NOT NULL,
    session_info TEXT,
    keywords TEXT,
    git_branch TEXT,
    git_commit TEXT,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

CREATE INDEX IF NOT EXISTS idx_context_sessions_project ON context_sessions(project);
CREATE INDEX IF NOT EXISTS idx_context_sessions_timestamp ON context_sessions(timestamp);
CREATE INDEX IF NOT EXISTS idx_context_sessions_keywords ON context_sessions(keywords);
CREATE INDEX IF NOT EXISTS idx_context_sessions_git_branch ON context_sessions(git_branch);
"#
);

const COLUMNS: &str =
    "id, project, timestamp, context_data, session_info, keywords, git_branch, git_commit, created_at";

/// A saved context capture for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSession {
    pub id: i64,
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub context_data: String,
    pub session_info: String,
    pub keywords: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`Database::save_context_session`].
#[derive(Debug, Clone, Default)]
pub struct NewContextSession {
    pub project: String,
    pub context_data: String,
    pub session_info: String,
    pub keywords: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
}

/// Opaque blobs produced by a context generator.
#[derive(Debug, Clone, Default)]
pub struct GeneratedContext {
    pub context_data: String,
    pub session_info: String,
    pub keywords: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
}

/// Produces the human-readable context for a project.
pub trait ContextGenerator {
    fn generate(&self, project: &str) -> Result<GeneratedContext>;
}

impl Database {
    /// Insert a new context session. Never deduplicates.
    pub async fn save_context(
        &self,
        project: &str,
        context_data: &str,
        session_info: &str,
        keywords: &str,
    ) -> Result<ContextSession> {
        self.save_context_session(NewContextSession {
            project: project.to_string(),
            context_data: context_data.to_string(),
            session_info: session_info.to_string(),
            keywords: keywords.to_string(),
            git_branch: None,
            git_commit: None,
        })
        .await
    }

    /// Insert a context session, returning it with its id and timestamps.
    pub async fn save_context_session(&self, session: NewContextSession) -> Result<ContextSession> {
        let now = db::now();
        let stamp = db::format_timestamp(now);

        let id = self
            .execute_returning_id(
                sqlx::query(
                    r#"
                    INSERT INTO context_sessions
                        (project, timestamp, context_data, session_info, keywords, git_branch, git_commit, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&session.project)
                .bind(&stamp)
                .bind(&session.context_data)
                .bind(&session.session_info)
                .bind(&session.keywords)
                .bind(&session.git_branch)
                .bind(&session.git_commit)
                .bind(&stamp),
            )
            .await
            .op("failed to save context")?;

        Ok(ContextSession {
            id,
            project: session.project,
            timestamp: now,
            context_data: session.context_data,
            session_info: session.session_info,
            keywords: session.keywords,
            git_branch: session.git_branch,
            git_commit: session.git_commit,
            created_at: now,
        })
    }

    /// Ask `generator` for the project's context and persist the result.
    pub async fn save_generated_context<G>(&self, project: &str, generator: &G) -> Result<ContextSession>
    where
        G: ContextGenerator + ?Sized,
    {
        let generated = generator
            .generate(project)
            .op("failed to generate context")?;
        self.save_context_session(NewContextSession {
            project: project.to_string(),
            context_data: generated.context_data,
            session_info: generated.session_info,
            keywords: generated.keywords,
            git_branch: generated.git_branch,
            git_commit: generated.git_commit,
        })
        .await
    }

    /// Most recent sessions for one project, newest first.
    pub async fn get_recent_contexts(&self, project: &str, limit: i64) -> Result<Vec<ContextSession>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM context_sessions WHERE project = ? ORDER BY julianday(timestamp) DESC, id DESC LIMIT ?"
        );
        let rows = self
            .fetch_all(sqlx::query(&sql).bind(project).bind(limit.max(0)))
            .await
            .op("failed to query recent contexts")?;

        rows.iter()
            .map(context_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query recent contexts")
    }

    /// Substring search over context text, keywords and session summary.
    /// Returns at most [`SEARCH_LIMIT`] sessions.
    ///
    /// Matching ignores case for ASCII letters only (SQLite `LIKE`), so
    /// `über` does not find `Über`.
    pub async fn search_stored_contexts(&self, keyword: &str) -> Result<Vec<ContextSession>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM context_sessions
            WHERE context_data LIKE ?1 ESCAPE '\'
               OR keywords LIKE ?1 ESCAPE '\'
               OR session_info LIKE ?1 ESCAPE '\'
            ORDER BY julianday(timestamp) DESC, id DESC
            LIMIT ?2
            "#
        );
        let pattern = super::like_pattern(keyword);
        let rows = self
            .fetch_all(sqlx::query(&sql).bind(pattern).bind(SEARCH_LIMIT))
            .await
            .op("failed to search contexts")?;

        rows.iter()
            .map(context_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to search contexts")
    }
}

fn context_from_row(row: &SqliteRow) -> Result<ContextSession> {
    Ok(ContextSession {
        id: row.try_get("id")?,
        project: row.try_get("project")?,
        timestamp: get_timestamp(row, "timestamp")?,
        context_data: row.try_get("context_data")?,
        session_info: row
            .try_get::<Option<String>, _>("session_info")?
            .unwrap_or_default(),
        keywords: row.try_get::<Option<String>, _>("keywords")?.unwrap_or_default(),
        git_branch: row.try_get("git_branch")?,
        git_commit: row.try_get("git_commit")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}
