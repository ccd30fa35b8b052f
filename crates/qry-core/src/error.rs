//! Error types for qry-core

use std::path::PathBuf;

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open database {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to migrate {tool} schema (version {version}): {source}")]
    Migration {
        tool: String,
        version: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors raised before any write was attempted.
    pub fn is_validation(&self) -> bool {
        match self {
            Error::Validation(_) => true,
            Error::Operation { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

/// Result type alias using Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Attach the name of the failing logical operation to an error.
pub(crate) trait OperationContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T, E: Into<Error>> OperationContext<T> for std::result::Result<T, E> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|e| Error::Operation {
            op,
            source: Box::new(e.into()),
        })
    }
}
