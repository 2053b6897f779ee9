//! Directory-tree primitives: size, recursive copy, removal.
//!
//! Walks never follow symlinks. A copied tree reproduces links as links, so a
//! backup of a tree containing a redirect does not duplicate the redirected data.

use rayon::prelude::*;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use super::helpers::io_error_with_help_io;
use super::meta::copy_metadata;

/// Counts from a finished `copy_tree`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeCopyStats {
    pub dirs: u64,
    pub files: u64,
    pub links: u64,
    pub bytes: u64,
}

/// Sum of regular-file sizes under `root`. Symlinks and unreadable entries are skipped.
pub fn tree_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Copy the directory `src` to `dst`, which must not exist yet.
///
/// Regular files are copied in parallel with their timestamps and permissions;
/// directory metadata is applied last, deepest first, so read-only directories
/// do not block their own contents. Sockets, FIFOs and device nodes are refused
/// before anything is written.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<TreeCopyStats> {
    let mut dirs: Vec<(PathBuf, Metadata)> = Vec::new();
    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut links: Vec<(PathBuf, PathBuf)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            dirs.push((target, entry.metadata().map_err(io::Error::from)?));
        } else if ft.is_file() {
            files.push((entry.into_path(), target));
        } else if ft.is_symlink() {
            links.push((entry.into_path(), target));
        } else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "unsupported file type (socket, fifo or device): {}",
                    entry.path().display()
                ),
            ));
        }
    }

    let root_meta = fs::metadata(src).map_err(io_error_with_help_io("stat", src))?;
    fs::create_dir(dst).map_err(io_error_with_help_io("create directory", dst))?;
    for (dir, _) in &dirs {
        fs::create_dir_all(dir).map_err(io_error_with_help_io("create directory", dir))?;
    }

    let bytes = files
        .par_iter()
        .map(|(from, to)| -> io::Result<u64> {
            let n = fs::copy(from, to).map_err(io_error_with_help_io("copy file", from))?;
            let meta = fs::metadata(from).map_err(io_error_with_help_io("stat", from))?;
            copy_metadata(&meta, to).map_err(io_error_with_help_io("set metadata", to))?;
            trace!(src = %from.display(), dest = %to.display(), bytes = n, "copied file");
            Ok(n)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    for (from, to) in &links {
        let link_target = fs::read_link(from).map_err(io_error_with_help_io("read link", from))?;
        copy_link(from, &link_target, to).map_err(io_error_with_help_io("create link", to))?;
    }

    for (dir, meta) in dirs.iter().rev() {
        copy_metadata(meta, dir).map_err(io_error_with_help_io("set metadata", dir))?;
    }
    copy_metadata(&root_meta, dst).map_err(io_error_with_help_io("set metadata", dst))?;

    let stats = TreeCopyStats {
        dirs: dirs.len() as u64,
        files: files.len() as u64,
        links: links.len() as u64,
        bytes,
    };
    debug!(src = %src.display(), dest = %dst.display(), ?stats, "tree copied");
    Ok(stats)
}

#[cfg(unix)]
fn copy_link(_original: &Path, link_target: &Path, at: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link_target, at)
}

#[cfg(windows)]
fn copy_link(original: &Path, link_target: &Path, at: &Path) -> io::Result<()> {
    if fs::metadata(original).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(link_target, at)
    } else {
        std::os::windows::fs::symlink_file(link_target, at)
    }
}

/// Remove whatever is at `path` without following it: a link (or junction) is
/// unlinked, a directory is removed recursively, anything else is deleted.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if crate::platform::is_redirect_metadata(&meta) {
        // Directory junctions need remove_dir on Windows; Unix symlinks need remove_file.
        return fs::remove_file(path).or_else(|_| fs::remove_dir(path));
    }
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
