//! Storage handle for the ecosystem store.
//!
//! [`Database`] owns the connection pool for one SQLite file. Repositories are
//! implemented as `impl Database` blocks in the submodules and go through the
//! generic execute/query surface defined here.

mod insights;
mod messages;
mod projects;
mod usage;

pub use projects::{project_name_from_path, sanitize_project_name};

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, SqlitePool};

use crate::discovery::{self, Discovery};
use crate::error::{Error, Result};
use crate::migrate::{ExtensionRegistry, Migrator};

/// Default time a statement waits for another writer's lock to clear.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database handle for the ecosystem store.
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
    is_shared: bool,
}

/// Everything a tool needs to locate, open and migrate its store.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Name of the tool opening the store; selects the extension schema.
    pub tool: String,
    /// Explicit path override. Skips discovery when set; still reported as
    /// shared when it is the discovery shared path.
    pub database: Option<PathBuf>,
    /// Private store used when the shared one is unavailable or not wanted.
    pub fallback_database: PathBuf,
    pub force_local: bool,
    pub discovery: Discovery,
    pub busy_timeout: Duration,
    pub registry: ExtensionRegistry,
}

impl ConnectOptions {
    pub fn new(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            fallback_database: crate::paths::private_database_path(&tool),
            tool,
            database: None,
            force_local: false,
            discovery: Discovery::new(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            registry: ExtensionRegistry::builtin(),
        }
    }
}

impl Database {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    pub async fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        discovery::ensure_parent_dir(path)?;

        let connect_err = |source| Error::Connect {
            path: path.to_path_buf(),
            source,
        };

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(connect_err)?;

        // Surface unreadable or corrupt files here rather than on first use.
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(connect_err)?;

        tracing::debug!(path = %path.display(), "opened database");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
            is_shared: false,
        })
    }

    /// Locate, open and migrate the store for `options.tool`.
    ///
    /// A store that fails migration is closed and never handed out.
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let (path, is_shared) = match &options.database {
            Some(path) => {
                let is_shared = path.as_path() == options.discovery.shared_path();
                (path.clone(), is_shared)
            }
            None => {
                let resolved = options.discovery.resolve(
                    &options.tool,
                    options.force_local,
                    &options.fallback_database,
                )?;
                (resolved.path, resolved.is_shared)
            }
        };

        let mut db = Self::open_with_timeout(&path, options.busy_timeout).await?;
        db.is_shared = is_shared;

        let migrator = Migrator::new(&options.registry);
        if let Err(err) = migrator.migrate(&db, &options.tool).await {
            db.close().await;
            return Err(err);
        }

        tracing::info!(
            tool = %options.tool,
            path = %db.path.display(),
            shared = db.is_shared,
            "ecosystem store ready"
        );
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this handle points at the shared ecosystem store.
    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    /// Close the database.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Generic statement surface
    // =========================================================================

    /// Run a single statement and return the number of affected rows.
    pub async fn execute<'q>(&self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Result<u64> {
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Run a single insert and return the generated row id.
    pub async fn execute_returning_id<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<i64> {
        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn fetch_all<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Vec<SqliteRow>> {
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn fetch_optional<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Option<SqliteRow>> {
        Ok(query.fetch_optional(&self.pool).await?)
    }

    /// Run a multi-statement script atomically. Reserved for schema changes.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql)).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let row = self
            .fetch_optional(
                sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(name),
            )
            .await?;
        Ok(row.is_some())
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Current time at the precision stored in the database.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Render a timestamp in the stored ISO format.
///
/// Other tools may write SQLite's `YYYY-MM-DD HH:MM:SS` into the same columns,
/// so queries order and compare through `julianday()` rather than as text.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    // SQLite's CURRENT_TIMESTAMP format, written by older tools.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))
}

pub(crate) fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw)
}

pub(crate) fn get_optional_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    row.try_get::<Option<String>, _>(column)?
        .as_deref()
        .map(parse_timestamp)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let earlier = DateTime::parse_from_rfc3339("2025-01-02T03:04:05.006Z")
            .expect("valid")
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(995);
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(earlier), "2025-01-02T03:04:05.006Z");
    }

    #[test]
    fn parses_own_format_and_sqlite_format() {
        let ours = parse_timestamp("2025-01-02T03:04:05.006Z").expect("parse timestamp");
        assert_eq!(ours.timestamp_subsec_millis(), 6);

        let sqlite = parse_timestamp("2025-01-02 03:04:05").expect("parse timestamp");
        assert_eq!(sqlite.timestamp(), ours.timestamp());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn now_round_trips_through_storage_format() {
        let t = now();
        assert_eq!(parse_timestamp(&format_timestamp(t)).expect("parse timestamp"), t);
    }
}
