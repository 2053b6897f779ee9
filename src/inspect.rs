//! Unit Inspector: read-only status of a unit's source path.

use std::fs;
use tracing::trace;

use crate::fs_ops::tree_size;
use crate::platform::is_redirect_metadata;
use crate::relocate::{RelocationUnit, UnitStatus};

/// Existence, size and redirect flag of `unit.source`. Never mutates anything.
///
/// The size is a best-effort display hint: regular files only, links and
/// unreadable entries skipped. A redirect is reported with size 0 because its
/// data lives elsewhere.
pub fn inspect(unit: &RelocationUnit) -> UnitStatus {
    let status = match fs::symlink_metadata(&unit.source) {
        Err(_) => UnitStatus::default(),
        Ok(meta) if is_redirect_metadata(&meta) => UnitStatus {
            exists: true,
            size_bytes: 0,
            is_redirect: true,
        },
        Ok(_) => UnitStatus {
            exists: true,
            size_bytes: tree_size(&unit.source),
            is_redirect: false,
        },
    };
    trace!(unit = %unit.name, src = %unit.source.display(), ?status, "inspected");
    status
}

/// `inspect` for each unit, in order.
pub fn inspect_all(units: &[RelocationUnit]) -> Vec<(RelocationUnit, UnitStatus)> {
    units.iter().map(|u| (u.clone(), inspect(u))).collect()
}
