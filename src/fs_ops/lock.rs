//! Advisory single-instance lock.
//!
//! Two instances relocating the same units concurrently can corrupt state, so the
//! front end holds `<dir>/zalo_move.lock` exclusively for the whole run.
//!
//! Notes:
//! - Best-effort: the lock is advisory (flock on Unix, LockFileEx on Windows via fs2).
//! - The lock is released when the InstanceLock guard is dropped; the file is left behind.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const LOCK_FILE_NAME: &str = "zalo_move.lock";

/// RAII guard held while the instance lock is active.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOCK_FILE_NAME);
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    opts.mode(0o600);
    let file = opts.open(&path)?;
    Ok((file, path))
}

/// Try to take the lock in `dir` without blocking.
/// Ok(None) means another instance holds it.
pub fn try_acquire_instance_lock(dir: &Path) -> io::Result<Option<InstanceLock>> {
    let (file, path) = open_lock_file(dir)?;
    match file.try_lock_exclusive() {
        Ok(()) => {
            trace!(path = %path.display(), "instance lock acquired");
            Ok(Some(InstanceLock { file, path }))
        }
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            trace!(path = %path.display(), "instance lock held elsewhere");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn uncontended_lock_is_acquired() {
        let dir = tempdir().unwrap();
        let lock = try_acquire_instance_lock(dir.path()).unwrap();
        assert!(lock.is_some());
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let first = try_acquire_instance_lock(dir.path()).unwrap().unwrap();
        assert!(try_acquire_instance_lock(dir.path()).unwrap().is_none());
        drop(first);
        assert!(try_acquire_instance_lock(dir.path()).unwrap().is_some());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let lock = try_acquire_instance_lock(&nested).unwrap().unwrap();
        assert_eq!(lock.path(), nested.join(LOCK_FILE_NAME));
    }
}
