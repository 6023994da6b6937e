//! core::ops::lock
//!
//! Exclusive host lock on a project.
//!
//! The core is single-writer and never locks on its own. Hosts that may run
//! alongside another instance (the `ef` binary) take this lock around every
//! mutating command so two processes never stage-and-commit into the same
//! project at once.
//!
//! # Storage
//!
//! - `<project>/.eventforge/lock` - Lock file with an OS-level exclusive lock
//!
//! # Invariants
//!
//! - Acquisition is non-blocking (fails fast if held)
//! - The lock is released on drop
//!
//! # Example
//!
//! ```ignore
//! use eventforge::core::ops::lock::ProjectLock;
//!
//! let lock = ProjectLock::acquire(store.paths())?;
//! staging.commit_all(&mut store)?;
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::ProjectPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("project is locked by another eventforge process")]
    AlreadyLocked,

    /// Failed to create the lock file or its directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a project, released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    file: File,
}

impl ProjectLock {
    /// Attempt to acquire the project lock.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &ProjectPaths) -> Result<Self, LockError> {
        let tool_dir = paths.tool_dir();
        fs::create_dir_all(&tool_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", tool_dir.display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("acquired project lock {}", path.display());
                Ok(Self { file })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(temp: &TempDir) -> ProjectPaths {
        ProjectPaths::new(temp.path().to_path_buf())
    }

    #[test]
    fn acquire_creates_tool_dir() {
        let temp = TempDir::new().unwrap();
        let paths = paths(&temp);
        assert!(!paths.tool_dir().exists());

        let _lock = ProjectLock::acquire(&paths).unwrap();
        assert!(paths.tool_dir().exists());
        assert!(paths.lock_path().is_file());
    }

    #[test]
    fn second_acquire_fails() {
        let temp = TempDir::new().unwrap();
        let paths = paths(&temp);

        let _lock = ProjectLock::acquire(&paths).unwrap();
        assert!(matches!(
            ProjectLock::acquire(&paths),
            Err(LockError::AlreadyLocked)
        ));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();
        let paths = paths(&temp);
        {
            let _lock = ProjectLock::acquire(&paths).unwrap();
        }
        assert!(ProjectLock::acquire(&paths).is_ok());
    }

    #[test]
    fn error_display() {
        assert!(LockError::AlreadyLocked.to_string().contains("locked"));
        assert!(LockError::CreateFailed("x".into())
            .to_string()
            .contains("create"));
    }
}
