//! Shared-versus-private store discovery.
//!
//! A tool always works against its own fallback store, but when the shared
//! ecosystem location is reachable it federates with its siblings there
//! without any configuration.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;

/// Outcome of discovery: which file to open and whether it is the shared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub is_shared: bool,
}

/// Decides which database file a tool should open.
#[derive(Debug, Clone)]
pub struct Discovery {
    shared_path: PathBuf,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            shared_path: paths::shared_database_path(),
        }
    }
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-standard shared store location.
    pub fn with_shared_path(path: impl Into<PathBuf>) -> Self {
        Self {
            shared_path: path.into(),
        }
    }

    pub fn shared_path(&self) -> &Path {
        &self.shared_path
    }

    /// Pick the shared store when reachable, otherwise `fallback`.
    ///
    /// The only filesystem write is creating the chosen file's parent directory.
    pub fn resolve(&self, tool: &str, force_local: bool, fallback: &Path) -> Result<Resolved> {
        if force_local {
            tracing::debug!(tool, path = %fallback.display(), "using private store (forced)");
            return local(fallback);
        }

        if shared_reachable(&self.shared_path) {
            tracing::debug!(tool, path = %self.shared_path.display(), "using shared ecosystem store");
            return Ok(Resolved {
                path: self.shared_path.clone(),
                is_shared: true,
            });
        }

        tracing::debug!(
            tool,
            shared = %self.shared_path.display(),
            path = %fallback.display(),
            "shared store unreachable, using private store"
        );
        local(fallback)
    }
}

fn shared_reachable(path: &Path) -> bool {
    if path.exists() {
        return true;
    }
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => true,
        Some(parent) => parent.is_dir() || std::fs::create_dir_all(parent).is_ok(),
        None => false,
    }
}

fn local(fallback: &Path) -> Result<Resolved> {
    ensure_parent_dir(fallback)?;
    Ok(Resolved {
        path: fallback.to_path_buf(),
        is_shared: false,
    })
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
        path: parent.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_local_skips_shared_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = dir.path().join("qry").join("ecosystem.sqlite");
        let fallback = dir.path().join("wherewasi").join("context.sqlite");

        let resolved = Discovery::with_shared_path(&shared)
            .resolve("wherewasi", true, &fallback)
            .expect("resolve");

        assert_eq!(resolved.path, fallback);
        assert!(!resolved.is_shared);
        assert!(fallback.parent().expect("parent dir").is_dir());
        assert!(!shared.parent().expect("parent dir").exists());
    }

    #[test]
    fn prefers_shared_store_when_directory_can_be_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = dir.path().join("qry").join("ecosystem.sqlite");
        let fallback = dir.path().join("uroboro").join("context.sqlite");

        let resolved = Discovery::with_shared_path(&shared)
            .resolve("uroboro", false, &fallback)
            .expect("resolve");

        assert!(resolved.is_shared);
        assert_eq!(resolved.path, shared);
        assert!(shared.parent().expect("parent dir").is_dir());
        assert!(!fallback.parent().expect("parent dir").exists());
    }

    #[test]
    fn prefers_existing_shared_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = dir.path().join("ecosystem.sqlite");
        std::fs::write(&shared, b"").expect("write file");

        let resolved = Discovery::with_shared_path(&shared)
            .resolve("examinator", false, &dir.path().join("private.sqlite"))
            .expect("resolve");

        assert!(resolved.is_shared);
    }

    #[test]
    fn falls_back_when_shared_directory_is_blocked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").expect("write file");
        let shared = blocker.join("qry").join("ecosystem.sqlite");
        let fallback = dir.path().join("wherewasi").join("context.sqlite");

        let resolved = Discovery::with_shared_path(&shared)
            .resolve("wherewasi", false, &fallback)
            .expect("resolve");

        assert!(!resolved.is_shared);
        assert_eq!(resolved.path, fallback);
        assert!(fallback.parent().expect("parent dir").is_dir());
    }

    #[test]
    fn unreachable_fallback_is_a_create_dir_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").expect("write file");

        let err = Discovery::with_shared_path(dir.path().join("shared.sqlite"))
            .resolve("wherewasi", true, &blocker.join("sub").join("context.sqlite"))
            .expect_err("should fail");

        assert!(matches!(err, Error::CreateDir { .. }));
    }
}
