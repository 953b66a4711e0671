//! Advisory lock held for the duration of a run.
//!
//! Selection is check-then-act on the filesystem: two overlapping runs could
//! both see the same archive as missing and build it twice, or one could
//! delete a file the other has just judged. When enabled, the job takes an
//! exclusive lock on a sentinel file in the archives folder and a second run
//! backs off instead of racing.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

/// An exclusive advisory lock on `<dir>/.tfx-cron.lock`, released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}
impl RunLock {
    pub const FILENAME: &'static str = ".tfx-cron.lock";

    /// Try to take the lock in `dir` without waiting.
    ///
    /// Returns `Ok(None)` if another process (or another handle in this
    /// process) already holds it. The sentinel file is created if needed and
    /// left in place afterwards.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(Self::FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .or_raise(|| ErrorKind::Lock)?;
        match file.try_lock() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Acquired run lock");
                Ok(Some(Self { path, file }))
            },
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(e).or_raise(|| ErrorKind::Lock),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl Drop for RunLock {
    fn drop(&mut self) {
        // Closing the file would release it anyway.
        _ = self.file.unlock();
        tracing::debug!(path = %self.path.display(), "Released run lock");
    }
}
