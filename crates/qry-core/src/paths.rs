//! Conventional on-disk locations for ecosystem data.

use std::path::PathBuf;

/// Directory name shared by every tool in the ecosystem.
pub const ECOSYSTEM_DIR: &str = crate::APP_NAME;

/// File name of the shared ecosystem store.
pub const SHARED_DB_FILE: &str = "ecosystem.sqlite";

/// File name of a tool's private store.
pub const PRIVATE_DB_FILE: &str = "context.sqlite";

pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Data directory owned by a single tool.
pub fn tool_data_dir(tool: &str) -> PathBuf {
    data_dir().join(tool)
}

/// Default private store for a tool, used when the shared store is unavailable.
pub fn private_database_path(tool: &str) -> PathBuf {
    tool_data_dir(tool).join(PRIVATE_DB_FILE)
}

/// The single well-known shared store, independent of tool identity.
pub fn shared_database_path() -> PathBuf {
    data_dir().join(ECOSYSTEM_DIR).join(SHARED_DB_FILE)
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(ECOSYSTEM_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_path_does_not_depend_on_tool() {
        let shared = shared_database_path();
        assert!(shared.ends_with("qry/ecosystem.sqlite"));
    }

    #[test]
    fn private_path_lives_under_tool_dir() {
        let path = private_database_path("uroboro");
        assert!(path.starts_with(tool_data_dir("uroboro")));
        assert!(path.ends_with("uroboro/context.sqlite"));
    }
}
