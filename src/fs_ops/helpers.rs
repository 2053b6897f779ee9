//! I/O error enrichment.
//!
//! Turns a bare `io::Error` into a message naming the operation, the path and,
//! where the OS code is recognised, what the operator should check.
//!
//! Usage:
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;
//!   let text = describe_io_error("rename", src, &e);

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn os_hint(code: i32) -> Option<&'static str> {
    #[cfg(unix)]
    {
        match code {
            libc::EACCES | libc::EPERM => {
                Some("permission denied; check ownership and write permissions")
            }
            libc::EXDEV => {
                Some("cross-filesystem; source and destination must be on the same volume")
            }
            libc::EBUSY => Some("resource busy; close the application using it and retry"),
            libc::ENOENT => Some("path not found"),
            libc::EEXIST | libc::ENOTEMPTY => Some("target already exists"),
            libc::ENOSPC => Some("no space left on device"),
            libc::EROFS => Some("read-only filesystem"),
            libc::ELOOP => Some("too many levels of symbolic links"),
            libc::ENAMETOOLONG => Some("path too long"),
            libc::EINVAL => Some("invalid target; a directory cannot be moved into itself"),
            _ => None,
        }
    }
    #[cfg(windows)]
    {
        match code {
            // ERROR_ACCESS_DENIED
            5 => Some("access denied; check permissions or run as the folder owner"),
            // ERROR_NOT_SAME_DEVICE
            17 => Some("not same device; source and destination must be on the same volume"),
            // SHARING / LOCK violation
            32 | 33 => Some("file is in use; close the application and retry"),
            2 | 3 => Some("path not found"),
            80 | 183 => Some("target already exists"), // FILE_EXISTS / ALREADY_EXISTS
            112 => Some("disk full"),
            206 => Some("path too long (MAX_PATH exceeded)"),
            _ => None,
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        None
    }
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("target already exists"),
        _ => None,
    }
}

/// "<op> '<path>': <error> (<hint>) [os code: N]"
pub fn describe_io_error(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{op} '{}': {e}", path.display());
    let hint = match e.raw_os_error() {
        Some(code) => os_hint(code),
        None => kind_hint(e.kind()),
    };
    if let Some(h) = hint {
        msg.push_str(&format!(" ({h})"));
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Adapter for anyhow::Result code: `.map_err(io_error_with_help(op, path))`.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(describe_io_error(op, path, &e))
}

/// Adapter for io::Result code; keeps the original ErrorKind.
pub fn io_error_with_help_io<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), describe_io_error(op, path, &e))
}
