//! Backup Manager: `<source>.old` copies made before a unit is moved.
//!
//! A backup is only deleted by `purge`, and `purge` only touches the exact
//! paths it is handed, so a backup created after a listing was shown survives.

use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::RelocateError;
use crate::fs_ops::{copy_tree, ensure_space_for_copy, remove_path, tree_size};
use crate::platform::is_redirect_metadata;
use crate::relocate::{ConflictPolicy, RelocationUnit};

pub const BACKUP_SUFFIX: &str = ".old";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

/// `source` with ".old" appended to its final component.
pub fn backup_path(source: &Path) -> PathBuf {
    let mut s: OsString = source.as_os_str().to_os_string();
    s.push(BACKUP_SUFFIX);
    PathBuf::from(s)
}

/// Copy `source` to its backup path.
///
/// An existing backup is replaced under `ConflictPolicy::Overwrite`; under
/// `Skip` the caller gets `ConflictUnresolved` and nothing is written. A failed
/// copy removes its partial output and never touches `source`.
pub fn create_backup(source: &Path, on_exists: ConflictPolicy) -> Result<PathBuf, RelocateError> {
    let backup = backup_path(source);
    let copy_failed = |reason: String| RelocateError::CopyFailed {
        path: backup.clone(),
        reason,
    };

    if fs::symlink_metadata(&backup).is_ok() {
        match on_exists {
            ConflictPolicy::Skip => {
                return Err(RelocateError::ConflictUnresolved {
                    path: backup.clone(),
                    what: "backup",
                });
            }
            ConflictPolicy::Overwrite => {
                remove_path(&backup)
                    .map_err(|e| copy_failed(format!("could not replace old backup: {e}")))?;
                info!(backup = %backup.display(), "removed previous backup");
            }
        }
    }

    if let Some(parent) = backup.parent() {
        ensure_space_for_copy(parent, tree_size(source)).map_err(|e| copy_failed(e.to_string()))?;
    }

    match copy_tree(source, &backup) {
        Ok(stats) => {
            info!(
                src = %source.display(),
                backup = %backup.display(),
                files = stats.files,
                bytes = stats.bytes,
                "backup created"
            );
            Ok(backup.clone())
        }
        Err(e) => {
            if fs::symlink_metadata(&backup).is_ok() {
                if let Err(cleanup) = remove_path(&backup) {
                    warn!(
                        backup = %backup.display(),
                        error = %cleanup,
                        "could not remove partial backup"
                    );
                }
            }
            Err(copy_failed(e.to_string()))
        }
    }
}

/// Every unit whose backup path currently exists, in unit order.
pub fn list_backups(units: &[RelocationUnit]) -> Vec<BackupEntry> {
    units
        .iter()
        .filter_map(|u| {
            let path = backup_path(&u.source);
            fs::symlink_metadata(&path).ok().map(|_| BackupEntry {
                name: u.name.clone(),
                path,
            })
        })
        .collect()
}

/// Delete exactly the confirmed backups. Never re-scans.
///
/// An entry is refused, and reported in `errors`, when its path does not end
/// in ".old", is a link, or no longer exists.
pub fn purge(confirmed: &[BackupEntry]) -> PurgeReport {
    let mut report = PurgeReport::default();
    for entry in confirmed {
        let path = &entry.path;
        if !path.as_os_str().to_string_lossy().ends_with(BACKUP_SUFFIX) {
            report
                .errors
                .push((path.clone(), "not a backup path (missing .old suffix)".into()));
            continue;
        }
        let meta = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                report.errors.push((path.clone(), e.to_string()));
                continue;
            }
        };
        if is_redirect_metadata(&meta) {
            report
                .errors
                .push((path.clone(), "refusing to purge a link or junction".into()));
            continue;
        }
        match remove_path(path) {
            Ok(()) => {
                info!(unit = %entry.name, backup = %path.display(), "backup purged");
                report.deleted.push(path.clone());
            }
            Err(e) => {
                warn!(unit = %entry.name, backup = %path.display(), error = %e, "purge failed");
                report.errors.push((path.clone(), e.to_string()));
            }
        }
    }
    report
}
