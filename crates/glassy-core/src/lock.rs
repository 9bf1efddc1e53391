//! Cross-process serialization of opacity actions
//!
//! The daemon serializes actions with in-memory locks. Without a daemon every
//! command is its own process, so an advisory `flock` on a file next to the
//! preference store takes that role.

use crate::errors::LockError;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on a file
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

/// Held lock; released on drop
pub struct FileLockGuard {
    _lock: Flock<File>,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until the lock is free and take it
    pub async fn acquire(&self) -> Result<FileLockGuard, LockError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || lock_blocking(&path))
            .await
            .map_err(|e| LockError::Io {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })?
    }
}

fn lock_blocking(path: &Path) -> Result<FileLockGuard, LockError> {
    let io_error = |source: std::io::Error| LockError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(io_error)?;

    let lock = Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_, errno)| io_error(errno.into()))?;
    Ok(FileLockGuard { _lock: lock })
}
