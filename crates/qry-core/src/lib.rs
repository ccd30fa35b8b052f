//! qry-core: shared ecosystem store for the qry tools
//!
//! Each tool can run against its own private SQLite file, but when the shared
//! ecosystem store is reachable every tool opens that one instead and gains
//! visibility into projects, usage, insights and messages written by its
//! siblings. This crate provides store discovery, idempotent multi-tool schema
//! migration, typed record repositories and the cross-tool message queue.

pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod extensions;
pub mod messaging;
pub mod migrate;
pub mod models;
pub mod paths;
pub mod payload;
pub mod schema;

pub use config::Config;
pub use db::{ConnectOptions, Database};
pub use discovery::{Discovery, Resolved};
pub use error::Error;
pub use error::Result;
pub use messaging::Messenger;
pub use migrate::{Extension, ExtensionRegistry, Migrator};
pub use models::{InsightType, MessageType, ToolName};

/// Application name used for config directories and paths.
pub const APP_NAME: &str = "qry";

/// Returns the environment variable prefix for this application.
pub fn env_prefix() -> String {
    "QRY".to_string()
}
