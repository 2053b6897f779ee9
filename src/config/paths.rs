//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{anyhow, Context, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV_VAR;

const APP_DIR: &str = "zalo_move";

/// Config file path: `$ZALO_MOVE_CONFIG` when set, else the OS config dir.
///
/// A relative override is resolved against the current directory; an override
/// naming a directory means `config.xml` inside it.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        let p = PathBuf::from(raw);
        let p = if p.is_absolute() {
            p
        } else {
            env::current_dir()
                .context("resolve relative ZALO_MOVE_CONFIG")?
                .join(p)
        };
        return Ok(if p.is_dir() { p.join("config.xml") } else { p });
    }
    config_dir()
        .map(|base| base.join(APP_DIR).join("config.xml"))
        .ok_or_else(|| anyhow!("could not determine a config directory for this user"))
}

/// OS-appropriate default log file path (data dir). The directory is created best-effort.
pub fn default_log_path() -> Result<PathBuf> {
    let base = data_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| anyhow!("could not determine a data directory for this user"))?;
    let _ = fs::create_dir_all(&base);
    Ok(base.join("zalo_move.log"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if let Ok(meta) = fs::symlink_metadata(anc) {
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_override_pointing_at_directory_means_config_xml() {
        let td = tempfile::tempdir().unwrap();
        unsafe { env::set_var(CONFIG_ENV_VAR, td.path()) };
        let p = default_config_path().unwrap();
        unsafe { env::remove_var(CONFIG_ENV_VAR) };
        assert_eq!(p, td.path().join("config.xml"));
    }

    #[test]
    #[serial]
    fn env_override_file_is_used_verbatim() {
        let td = tempfile::tempdir().unwrap();
        let f = td.path().join("custom.xml");
        unsafe { env::set_var(CONFIG_ENV_VAR, &f) };
        let p = default_config_path().unwrap();
        unsafe { env::remove_var(CONFIG_ENV_VAR) };
        assert_eq!(p, f);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_ancestor_is_detected() {
        let td = tempfile::tempdir().unwrap();
        let real = td.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = td.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(path_has_symlink_ancestor(&link.join("app.log")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("app.log")).unwrap());
    }
}
