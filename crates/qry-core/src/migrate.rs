//! Schema registry and migrator.
//!
//! The shared core schema is applied first, then the extension schema of the
//! tool opening the store. Extensions are registered by tool name, so adding a
//! tool never touches the migrator itself.

use std::collections::{BTreeMap, HashSet};

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::{Database, get_timestamp};
use crate::error::{Error, OperationContext, Result};
use crate::models::MigrationRecord;
use crate::schema::{CORE_OWNER, CORE_SCHEMA, CORE_VERSION};

/// A tool's additive schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub tool: &'static str,
    /// Ledger version; unique across all extensions.
    pub version: i64,
    pub description: &'static str,
    /// `CREATE ... IF NOT EXISTS` statements only.
    pub schema: &'static str,
    /// Extensions whose tables this one references.
    pub depends_on: &'static [&'static str],
}

/// Maps tool names to their extension schemas.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<&'static str, Extension>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every extension compiled into this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for ext in crate::extensions::BUILTIN {
            registry.extensions.insert(ext.tool, *ext);
        }
        registry
    }

    /// Add or replace the extension for `ext.tool`.
    pub fn register(&mut self, ext: Extension) -> Result<()> {
        if ext.version == CORE_VERSION {
            return Err(Error::Validation(format!(
                "extension {} cannot use the core schema version {CORE_VERSION}",
                ext.tool
            )));
        }
        if let Some(other) = self
            .extensions
            .values()
            .find(|other| other.version == ext.version && other.tool != ext.tool)
        {
            return Err(Error::Validation(format!(
                "extension {} reuses version {} already owned by {}",
                ext.tool, ext.version, other.tool
            )));
        }
        self.extensions.insert(ext.tool, ext);
        Ok(())
    }

    pub fn tools(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.keys().copied()
    }

    /// Extensions to apply for `tool`, dependencies first.
    pub fn plan(&self, tool: &str) -> Result<Vec<Extension>> {
        let mut order = Vec::new();
        if self.extensions.contains_key(tool) {
            let mut visiting = HashSet::new();
            let mut done = HashSet::new();
            self.visit(tool, &mut visiting, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        tool: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<Extension>,
    ) -> Result<()> {
        if done.contains(tool) {
            return Ok(());
        }
        let ext = self.extensions.get(tool).ok_or_else(|| {
            Error::Config(format!("extension dependency {tool} is not registered"))
        })?;
        if !visiting.insert(tool.to_string()) {
            return Err(Error::Config(format!(
                "extension dependency cycle through {tool}"
            )));
        }
        for dep in ext.depends_on {
            self.visit(dep, visiting, done, order)?;
        }
        visiting.remove(tool);
        done.insert(tool.to_string());
        order.push(*ext);
        Ok(())
    }
}

/// Brings a store up to date for one tool.
pub struct Migrator<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> Migrator<'a> {
    pub fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Apply the core schema if missing, then `tool`'s extension schema.
    ///
    /// Safe to run any number of times, from any number of processes.
    pub async fn migrate(&self, db: &Database, tool: &str) -> Result<()> {
        if let Err(err) = ensure_core(db).await {
            return Err(migration_error(CORE_OWNER, CORE_VERSION, err));
        }

        let plan = match self.registry.plan(tool) {
            Ok(plan) => plan,
            Err(err) => return Err(migration_error(tool, 0, err)),
        };
        if plan.is_empty() {
            tracing::debug!(tool, "no extension schema registered");
        }
        for ext in plan {
            if let Err(err) = apply(db, ext).await {
                return Err(migration_error(ext.tool, ext.version, err));
            }
        }
        Ok(())
    }
}

async fn ensure_core(db: &Database) -> Result<()> {
    if db.table_exists("schema_migrations").await? {
        tracing::debug!("core schema already present");
    } else {
        db.execute_batch(CORE_SCHEMA).await?;
        tracing::info!(version = CORE_VERSION, "created shared ecosystem schema");
    }
    Ok(())
}

async fn apply(db: &Database, ext: Extension) -> Result<()> {
    let already = is_recorded(db, ext.version).await?;
    let script = format!(
        "{}\nINSERT OR IGNORE INTO schema_migrations (version, tool, description) VALUES ({}, {}, {});\n",
        ext.schema,
        ext.version,
        sql_literal(ext.tool),
        sql_literal(ext.description),
    );
    db.execute_batch(&script).await?;

    if already {
        tracing::debug!(tool = ext.tool, version = ext.version, "extension schema up to date");
    } else {
        tracing::info!(tool = ext.tool, version = ext.version, "applied extension schema");
    }
    Ok(())
}

impl Database {
    /// Ledger rows, oldest version first.
    pub async fn applied_migrations(&self) -> Result<Vec<MigrationRecord>> {
        let rows = self
            .fetch_all(sqlx::query(
                "SELECT version, tool, description, applied_at FROM schema_migrations ORDER BY version",
            ))
            .await
            .op("failed to list migrations")?;

        rows.iter()
            .map(migration_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to list migrations")
    }
}

fn migration_from_row(row: &SqliteRow) -> Result<MigrationRecord> {
    Ok(MigrationRecord {
        version: row.try_get("version")?,
        tool: row.try_get("tool")?,
        description: row.try_get("description")?,
        applied_at: get_timestamp(row, "applied_at")?,
    })
}

async fn is_recorded(db: &Database, version: i64) -> Result<bool> {
    let row = db
        .fetch_optional(sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?").bind(version))
        .await?;
    Ok(row.is_some())
}

fn migration_error(tool: &str, version: i64, source: Error) -> Error {
    Error::Migration {
        tool: tool.to_string(),
        version,
        source: Box::new(source),
    }
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
