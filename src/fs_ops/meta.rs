//! Metadata carried over when a tree is copied into a backup.
//! Timestamps always; permission bits on Unix, read-only flag elsewhere.

use filetime::{set_file_times, FileTime};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Apply `src_meta`'s access/modify times and permissions to `dest`.
pub(crate) fn copy_metadata(src_meta: &Metadata, dest: &Path) -> io::Result<()> {
    let atime = FileTime::from_last_access_time(src_meta);
    let mtime = FileTime::from_last_modification_time(src_meta);
    set_file_times(dest, atime, mtime)?;
    fs::set_permissions(dest, src_meta.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mtime_is_carried_over() {
        let td = tempdir().unwrap();
        let src = td.path().join("a");
        let dst = td.path().join("b");
        fs::write(&src, b"1").unwrap();
        fs::write(&dst, b"1").unwrap();
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        set_file_times(&src, old, old).unwrap();

        copy_metadata(&fs::metadata(&src).unwrap(), &dst).unwrap();

        let got = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(got, old);
    }
}
