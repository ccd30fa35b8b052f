//! Shared core schema for the ecosystem store.
//!
//! Every tool depends on these tables; tool-owned tables live with their
//! extensions under `extensions/`.

/// Ledger version recorded for the shared core schema.
pub const CORE_VERSION: i64 = 1;

/// Ledger owner of the shared core schema.
pub const CORE_OWNER: &str = "ecosystem";

/// Timestamp default matching the format written by the core.
macro_rules! now_default {
    () => {
        "(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))"
    };
}
pub(crate) use now_default;

/// SQL schema for the shared tables and the migrations ledger.
pub const CORE_SCHEMA: &str = concat!(
    r#"
-- Projects tracked across the ecosystem
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    description TEXT,
    path TEXT,
    git_repo BOOLEAN NOT NULL DEFAULT 0,
    last_activity TEXT,
    primary_tool TEXT,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    updated_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

-- Cross-tool communication
CREATE TABLE IF NOT EXISTS tool_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_tool TEXT NOT NULL,
    to_tool TEXT NOT NULL,
    message_type TEXT NOT NULL,
    data TEXT NOT NULL,
    processed BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    processed_at TEXT
);

-- Usage analytics
CREATE TABLE IF NOT EXISTS usage_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tool TEXT NOT NULL,
    command TEXT NOT NULL,
    project TEXT,
    duration_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT 1,
    error_message TEXT,
    session_id TEXT,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

-- Cross-tool insights and recommendations
CREATE TABLE IF NOT EXISTS ecosystem_insights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    insight_type TEXT NOT NULL,
    source_tool TEXT NOT NULL,
    target_tool TEXT,
    project TEXT,
    confidence REAL NOT NULL DEFAULT 0.0 CHECK (confidence >= 0.0 AND confidence <= 1.0),
    data TEXT NOT NULL,
    applied BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    applied_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_projects_last_activity ON projects(last_activity);
CREATE INDEX IF NOT EXISTS idx_tool_messages_to_tool ON tool_messages(to_tool, processed);
CREATE INDEX IF NOT EXISTS idx_tool_messages_from_tool ON tool_messages(from_tool);
CREATE INDEX IF NOT EXISTS idx_usage_stats_tool ON usage_stats(tool);
CREATE INDEX IF NOT EXISTS idx_usage_stats_project ON usage_stats(project);
CREATE INDEX IF NOT EXISTS idx_ecosystem_insights_target ON ecosystem_insights(target_tool, applied);
CREATE INDEX IF NOT EXISTS idx_ecosystem_insights_project ON ecosystem_insights(project);

-- Schema migration tracking table
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    tool TEXT NOT NULL,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

INSERT OR IGNORE INTO schema_migrations (version, tool, description)
VALUES (1, 'ecosystem', 'Initial shared ecosystem schema');
"#
);
