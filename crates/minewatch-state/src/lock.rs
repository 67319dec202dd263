//! Exclusive run lock.
//!
//! A non-blocking `flock(2)` on a well-known file. A second run that
//! finds the lock held gets `None` and is expected to exit immediately.
//! The kernel drops the lock when the holder exits, so a crashed run
//! never leaves a stale lock behind.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StateError, StateResult};

/// Held for the duration of a run; released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock without waiting.
    ///
    /// Returns `Ok(None)` when another process holds it.
    pub fn try_acquire(path: &Path) -> StateResult<Option<Self>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Lock(format!("{}: {e}", parent.display())))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| StateError::Lock(format!("{}: {e}", path.display())))?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                debug!(path = ?path, "run lock held elsewhere");
                return Ok(None);
            }
            return Err(StateError::Lock(format!("{}: {err}", path.display())));
        }

        debug!(path = ?path, "run lock acquired");
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // SAFETY: `self.file` is still open here.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minewatch.lock");

        let first = RunLock::try_acquire(&path).unwrap();
        assert!(first.is_some());

        let second = RunLock::try_acquire(&path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks/minewatch.lock");

        let first = RunLock::try_acquire(&path).unwrap().unwrap();
        assert_eq!(first.path(), path.as_path());
        drop(first);

        assert!(RunLock::try_acquire(&path).unwrap().is_some());
    }
}
