//! Single-run guard for the scratch directory
//!
//! Two runs sharing a scratch root would overwrite each other's artifacts
//! mid-upload. A run holds an exclusive `fs2` advisory lock on
//! `<scratch_root>/.njdoe-sync.lock` for its whole lifetime.
//!
//! Advisory locks are cooperative: only other `njdoe-sync` processes honor it.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LOCK_FILE_NAME: &str = ".njdoe-sync.lock";

/// Held for the duration of a run; the lock is released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without blocking. Fails if another run holds it.
    pub fn acquire(scratch_root: &Path) -> Result<Self> {
        fs::create_dir_all(scratch_root).with_context(|| {
            format!(
                "Failed to create scratch directory: {}",
                scratch_root.display()
            )
        })?;

        let path = scratch_root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
            {
                bail!(
                    "Another sync run is already using {} (lock: {})",
                    scratch_root.display(),
                    path.display()
                );
            }
            return Err(e)
                .with_context(|| format!("Failed to acquire lock: {}", path.display()));
        }

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_scratch_root() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("data");

        let lock = RunLock::acquire(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(lock.path(), root.join(LOCK_FILE_NAME));
    }

    #[test]
    fn test_second_run_is_refused() {
        let temp = tempfile::tempdir().unwrap();

        let _held = RunLock::acquire(temp.path()).unwrap();
        let err = RunLock::acquire(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Another sync run"));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = tempfile::tempdir().unwrap();

        drop(RunLock::acquire(temp.path()).unwrap());
        assert!(RunLock::acquire(temp.path()).is_ok());
    }
}
