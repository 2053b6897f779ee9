//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.
//!
//! Redirects are directory symlinks on Unix and directory junctions on Windows.

#[cfg(unix)]
mod common_unix;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    create_redirect, free_space_bytes, is_redirect_metadata, open_log_file_secure_append,
    set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    create_redirect, free_space_bytes, is_redirect_metadata, open_log_file_secure_append,
    set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600,
};

use std::fs;
use std::path::Path;

/// True when `path` itself is a redirect (symlink / reparse point). Never follows it.
/// A path that does not exist is never a redirect.
pub fn is_redirect(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| is_redirect_metadata(&m))
        .unwrap_or(false)
}
