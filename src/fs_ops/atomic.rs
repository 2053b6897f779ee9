//! Whole-tree rename.
//! - A single rename; never falls back to copy + delete.
//! - Cross-volume renames surface as `RenameError::CrossDevice`.
//! - On Unix, best-effort fsync of both parent directories afterwards.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use super::helpers::describe_io_error;
use super::util::{fsync_dir, is_cross_device};

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("{0}; copy the folder manually or pick a destination on the same volume")]
    CrossDevice(String),
    #[error("{0}")]
    Io(String),
}

impl RenameError {
    fn from_io(src: &Path, e: io::Error) -> Self {
        let msg = describe_io_error("rename", src, &e);
        if is_cross_device(&e) {
            RenameError::CrossDevice(msg)
        } else {
            RenameError::Io(msg)
        }
    }
}

/// Rename the directory `src` to `dst`. `dst` must not exist.
pub fn rename_tree(src: &Path, dst: &Path) -> Result<(), RenameError> {
    fs::rename(src, dst).map_err(|e| RenameError::from_io(src, e))?;

    // Ignore fsync errors to avoid turning a successful rename into a failure.
    if let Some(parent) = dst.parent() {
        let _ = fsync_dir(parent);
    }
    if let Some(parent) = src.parent() {
        let _ = fsync_dir(parent);
    }
    Ok(())
}
