use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Quick writable probe: create and remove a small file in `dir`.
/// Uses create_new to avoid clobbering existing files.
pub(crate) fn is_writable_probe(dir: &Path) -> io::Result<()> {
    let probe = dir.join(format!(".zalo_move_probe_{}.tmp", std::process::id()));
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&probe)?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Canonical form of `path`. When it does not exist yet, the nearest existing
/// ancestor is canonicalized and the missing tail appended as given.
pub(crate) fn real_or_given(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut cur = path;
    loop {
        if let Ok(real) = dunce::canonicalize(cur) {
            return tail.iter().rev().fold(real, |acc: PathBuf, c| acc.join(c));
        }
        match (cur.parent(), cur.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                cur = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// True when `inner` equals `outer` or lies beneath it, after resolving symlinks
/// where the paths exist.
pub(crate) fn path_is_within(inner: &Path, outer: &Path) -> bool {
    real_or_given(inner).starts_with(real_or_given(outer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writable_probe_leaves_nothing_behind() {
        let td = tempdir().unwrap();
        is_writable_probe(td.path()).unwrap();
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);
    }

    #[test]
    fn writable_probe_fails_on_missing_dir() {
        let td = tempdir().unwrap();
        assert!(is_writable_probe(&td.path().join("missing")).is_err());
    }

    #[test]
    fn within_checks_components_not_prefixes() {
        let td = tempdir().unwrap();
        let a = td.path().join("data");
        let b = td.path().join("data2");
        fs::create_dir_all(a.join("inner")).unwrap();
        fs::create_dir_all(&b).unwrap();
        assert!(path_is_within(&a.join("inner"), &a));
        assert!(path_is_within(&a, &a));
        assert!(!path_is_within(&b, &a));
    }

    #[cfg(unix)]
    #[test]
    fn within_resolves_links_for_missing_paths() {
        let td = tempdir().unwrap();
        let real = td.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = td.path().join("alias");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(path_is_within(&link.join("not/yet/there"), &real));
        assert_eq!(real_or_given(&link.join("x")), dunce::canonicalize(&real).unwrap().join("x"));
    }
}
