//! Projects tracked across the ecosystem.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{Database, format_timestamp, get_optional_timestamp, get_timestamp, now};
use crate::error::{Error, OperationContext, Result};
use crate::models::Project;

const MAX_PROJECT_NAME: usize = 255;

impl Database {
    /// Record activity on a project, creating it on first sight.
    ///
    /// Re-tracking an existing name overwrites path, owner and git flag and
    /// refreshes the activity timestamp.
    pub async fn track_project(
        &self,
        name: &str,
        path: &str,
        primary_tool: &str,
        is_git_repo: bool,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::Validation("project name cannot be empty".to_string()))
                .op("failed to track project");
        }

        let stamp = format_timestamp(now());
        self.execute(
            sqlx::query(
                r#"
                INSERT INTO projects (name, path, primary_tool, git_repo, last_activity, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    path = excluded.path,
                    primary_tool = excluded.primary_tool,
                    git_repo = excluded.git_repo,
                    last_activity = excluded.last_activity,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(name)
            .bind(path)
            .bind(primary_tool)
            .bind(is_git_repo)
            .bind(&stamp)
            .bind(&stamp)
            .bind(&stamp),
        )
        .await
        .op("failed to track project")?;
        Ok(())
    }

    /// Most recently active projects first.
    pub async fn get_recent_projects(&self, limit: i64) -> Result<Vec<Project>> {
        let rows = self
            .fetch_all(
                sqlx::query(
                    "SELECT * FROM projects ORDER BY julianday(last_activity) DESC, id DESC LIMIT ?",
                )
                .bind(limit.max(0)),
            )
            .await
            .op("failed to query recent projects")?;

        rows.iter()
            .map(project_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query recent projects")
    }

    /// Get a project by name.
    pub async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let row = self
            .fetch_optional(sqlx::query("SELECT * FROM projects WHERE name = ?").bind(name))
            .await
            .op("failed to get project")?;

        row.as_ref()
            .map(project_from_row)
            .transpose()
            .op("failed to get project")
    }
}

/// Clean a free-form name so it can be used as a project key.
pub fn sanitize_project_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    cleaned.chars().take(MAX_PROJECT_NAME).collect()
}

/// Project name implied by a directory path: its last component.
pub fn project_name_from_path(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| sanitize_project_name(&name.to_string_lossy()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        path: row.try_get("path")?,
        git_repo: row.try_get::<Option<bool>, _>("git_repo")?.unwrap_or(false),
        last_activity: get_optional_timestamp(row, "last_activity")?,
        primary_tool: row.try_get("primary_tool")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_project_name("  team/app:v2\\x "), "team_app_v2_x");
    }

    #[test]
    fn sanitize_truncates_long_names() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_project_name(&long).len(), MAX_PROJECT_NAME);
    }

    #[test]
    fn project_name_comes_from_last_component() {
        assert_eq!(project_name_from_path(Path::new("/home/me/code/demo")), "demo");
        assert_eq!(project_name_from_path(Path::new("/")), "unknown");
    }
}
