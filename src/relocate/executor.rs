//! Relocation Executor: move one unit and leave a redirect behind.
//!
//! Order of operations for one unit:
//! 1. destination conflict (declined overwrite => Skipped)
//! 2. source must exist and must not already be a redirect
//! 3. optional backup to `<source>.old`
//! 4. clear the destination if overwrite was confirmed
//! 5. rename source -> destination (never copy + delete)
//! 6. create the redirect at the source path
//! 7. verify the redirect resolves to the destination
//!
//! The confirmed destination overwrite is applied only once the source is known
//! to exist and the backup succeeded, so a unit that fails early never costs the
//! data already sitting at the destination.
//!
//! A failure at 6 or 7 is fail-forward: the data stays at the destination and
//! the result is Failed + degraded, naming the link that still has to be made.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::types::{ConflictPolicy, RelocationPolicy, RelocationResult, RelocationUnit};
use crate::backup::create_backup;
use crate::errors::RelocateError;
use crate::fs_ops::{describe_io_error, remove_path, rename_tree};
use crate::platform::{self, is_redirect_metadata};
use crate::utils::path_is_within;

/// Creates the redirect at a unit's old location.
pub trait Redirector {
    fn create(&self, link: &Path, target: &Path) -> io::Result<()>;
}

/// Junction on Windows, directory symlink on Unix.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformRedirector;

impl Redirector for PlatformRedirector {
    fn create(&self, link: &Path, target: &Path) -> io::Result<()> {
        platform::create_redirect(link, target)
    }
}

#[derive(Debug, Default)]
pub struct RelocationExecutor<R: Redirector = PlatformRedirector> {
    redirector: R,
}

impl RelocationExecutor<PlatformRedirector> {
    pub fn new() -> Self {
        Self {
            redirector: PlatformRedirector,
        }
    }
}

impl<R: Redirector> RelocationExecutor<R> {
    pub fn with_redirector(redirector: R) -> Self {
        Self { redirector }
    }

    /// Relocate `unit` into `destination_base/<unit.name>`. Never panics or
    /// returns early with an error: every outcome is a `RelocationResult`.
    pub fn relocate(
        &self,
        unit: &RelocationUnit,
        destination_base: &Path,
        policy: &RelocationPolicy,
    ) -> RelocationResult {
        match self.try_relocate(unit, destination_base, policy) {
            Ok(dest) => {
                info!(
                    unit = %unit.name,
                    src = %unit.source.display(),
                    dest = %dest.display(),
                    "unit relocated"
                );
                RelocationResult::moved(&unit.name, dest)
            }
            Err(e) if e.is_skip() => {
                info!(unit = %unit.name, code = e.code(), reason = %e, "unit skipped");
                RelocationResult::from_error(&unit.name, &e)
            }
            Err(e) => {
                error!(
                    unit = %unit.name,
                    code = e.code(),
                    degraded = e.is_degraded(),
                    error = %e,
                    "unit failed"
                );
                RelocationResult::from_error(&unit.name, &e)
            }
        }
    }

    fn try_relocate(
        &self,
        unit: &RelocationUnit,
        destination_base: &Path,
        policy: &RelocationPolicy,
    ) -> Result<PathBuf, RelocateError> {
        let source = unit.source.as_path();
        let base = std::path::absolute(destination_base).map_err(|e| RelocateError::MoveFailed {
            from: source.to_path_buf(),
            to: destination_base.to_path_buf(),
            reason: describe_io_error("resolve destination", destination_base, &e),
        })?;
        let new_path = unit.destination_in(&base);
        let move_failed = |reason: String| RelocateError::MoveFailed {
            from: source.to_path_buf(),
            to: new_path.clone(),
            reason,
        };

        // Checked before anything is removed: the target must not overlap the
        // source in either direction.
        if path_is_within(source, &new_path) || path_is_within(&new_path, source) {
            return Err(move_failed(format!(
                "destination '{}' overlaps the source",
                new_path.display()
            )));
        }

        // 1. Destination conflict.
        let destination_taken = fs::symlink_metadata(&new_path).is_ok();
        if destination_taken && policy.on_destination_exists == ConflictPolicy::Skip {
            return Err(RelocateError::ConflictUnresolved {
                path: new_path.clone(),
                what: "destination",
            });
        }

        // 2. Source.
        let meta = match fs::symlink_metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RelocateError::NotFound(source.to_path_buf()));
            }
            Err(e) => return Err(move_failed(describe_io_error("stat", source, &e))),
        };
        if is_redirect_metadata(&meta) {
            return Err(RelocateError::AlreadyRedirected(source.to_path_buf()));
        }
        if !meta.is_dir() {
            return Err(move_failed(format!(
                "'{}' is not a directory",
                source.display()
            )));
        }

        // 3. Backup.
        if policy.make_backup {
            let backup = create_backup(source, policy.on_backup_exists)?;
            debug!(unit = %unit.name, backup = %backup.display(), "backup ready");
        }

        // 4. Confirmed overwrite of the destination.
        if destination_taken {
            remove_path(&new_path).map_err(|e| {
                move_failed(describe_io_error("remove existing destination", &new_path, &e))
            })?;
            warn!(unit = %unit.name, dest = %new_path.display(), "replaced existing destination");
        }
        fs::create_dir_all(&base)
            .map_err(|e| move_failed(describe_io_error("create destination base", &base, &e)))?;

        // 5. Move.
        rename_tree(source, &new_path).map_err(|e| move_failed(e.to_string()))?;
        info!(unit = %unit.name, src = %source.display(), dest = %new_path.display(), "tree moved");

        // 6. Redirect.
        let redirect_failed = |reason: String| RelocateError::RedirectFailed {
            link: source.to_path_buf(),
            target: new_path.clone(),
            reason,
        };
        self.redirector
            .create(source, &new_path)
            .map_err(|e| redirect_failed(describe_io_error("create redirect", source, &e)))?;

        // 7. Verify.
        verify_redirect(source, &new_path).map_err(redirect_failed)?;
        Ok(new_path)
    }
}

/// The link must be a redirect and resolve to the same directory as `target`.
fn verify_redirect(link: &Path, target: &Path) -> Result<(), String> {
    if !platform::is_redirect(link) {
        return Err(format!("'{}' is not a redirect after creation", link.display()));
    }
    let resolved = dunce::canonicalize(link)
        .map_err(|e| describe_io_error("resolve redirect", link, &e))?;
    let expected = dunce::canonicalize(target)
        .map_err(|e| describe_io_error("resolve destination", target, &e))?;
    if resolved != expected {
        return Err(format!(
            "redirect resolves to '{}' instead of '{}'",
            resolved.display(),
            expected.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocate::Outcome;
    use assert_fs::prelude::*;

    struct FailingRedirector;
    impl Redirector for FailingRedirector {
        fn create(&self, _link: &Path, _target: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "junctions disabled"))
        }
    }

    /// Creates a redirect pointing somewhere other than asked.
    #[cfg(unix)]
    struct MisdirectingRedirector(PathBuf);
    #[cfg(unix)]
    impl Redirector for MisdirectingRedirector {
        fn create(&self, link: &Path, _target: &Path) -> io::Result<()> {
            std::os::unix::fs::symlink(&self.0, link)
        }
    }

    fn no_backup() -> RelocationPolicy {
        RelocationPolicy {
            make_backup: false,
            ..RelocationPolicy::default()
        }
    }

    fn setup(td: &assert_fs::TempDir) -> (RelocationUnit, PathBuf) {
        let src = td.child("home/ZaloData");
        src.child("profile/settings.json").write_str("{\"a\":1}").unwrap();
        src.child("cache.bin").write_binary(&[9; 64]).unwrap();
        let dest = td.path().join("D");
        (RelocationUnit::new("ZaloData", src.path()), dest)
    }

    #[test]
    fn moves_and_redirects() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);

        let r = RelocationExecutor::new().relocate(&unit, &dest, &no_backup());

        assert_eq!(r.outcome, Outcome::Moved, "{}", r.detail);
        let new_path = dest.join("ZaloData");
        assert_eq!(r.destination.as_deref(), Some(new_path.as_path()));
        assert!(platform::is_redirect(&unit.source));
        assert_eq!(
            fs::read_to_string(unit.source.join("profile/settings.json")).unwrap(),
            "{\"a\":1}"
        );
        assert_eq!(fs::read(new_path.join("cache.bin")).unwrap(), vec![9; 64]);
    }

    #[test]
    fn missing_source_fails() {
        let td = assert_fs::TempDir::new().unwrap();
        let unit = RelocationUnit::new("Zalo", td.path().join("gone"));
        let r = RelocationExecutor::new().relocate(&unit, &td.path().join("D"), &no_backup());
        assert_eq!(r.outcome, Outcome::Failed);
        assert!(r.detail.contains("source not found"));
    }

    #[test]
    fn declined_destination_overwrite_skips_untouched() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);
        td.child("D/ZaloData/keep.txt").write_str("existing").unwrap();

        let r = RelocationExecutor::new().relocate(&unit, &dest, &no_backup());

        assert_eq!(r.outcome, Outcome::Skipped);
        assert!(unit.source.join("cache.bin").exists());
        assert!(!platform::is_redirect(&unit.source));
        assert_eq!(fs::read_to_string(dest.join("ZaloData/keep.txt")).unwrap(), "existing");
    }

    #[test]
    fn confirmed_destination_overwrite_replaces_it() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);
        td.child("D/ZaloData/stale.txt").write_str("old").unwrap();
        let policy = RelocationPolicy {
            on_destination_exists: ConflictPolicy::Overwrite,
            make_backup: false,
            ..RelocationPolicy::default()
        };

        let r = RelocationExecutor::new().relocate(&unit, &dest, &policy);

        assert_eq!(r.outcome, Outcome::Moved, "{}", r.detail);
        assert!(!dest.join("ZaloData/stale.txt").exists());
        assert!(dest.join("ZaloData/cache.bin").exists());
    }

    #[test]
    fn overwrite_keeps_destination_when_source_is_missing() {
        let td = assert_fs::TempDir::new().unwrap();
        td.child("D/Zalo/only-copy.txt").write_str("precious").unwrap();
        let unit = RelocationUnit::new("Zalo", td.path().join("gone"));
        let policy = RelocationPolicy {
            on_destination_exists: ConflictPolicy::Overwrite,
            make_backup: false,
            ..RelocationPolicy::default()
        };

        let r = RelocationExecutor::new().relocate(&unit, &td.path().join("D"), &policy);

        assert_eq!(r.outcome, Outcome::Failed);
        assert!(td.path().join("D/Zalo/only-copy.txt").exists());
    }

    #[test]
    fn overlapping_destination_is_refused_before_removal() {
        let td = assert_fs::TempDir::new().unwrap();
        td.child("home/Zalo/precious.txt").write_str("keep me").unwrap();
        td.child("home/Zalo/Zalo/nested.txt").write_str("nested").unwrap();
        let source = td.path().join("home/Zalo");
        let policy = RelocationPolicy {
            on_destination_exists: ConflictPolicy::Overwrite,
            make_backup: false,
            ..RelocationPolicy::default()
        };
        let cases = [
            // base/Zalo is the source itself
            (RelocationUnit::new("Zalo", &source), td.path().join("home")),
            // base/Zalo lies inside the source
            (RelocationUnit::new("Zalo", &source), source.clone()),
            // base/home contains the source
            (RelocationUnit::new("home", &source), td.path().to_path_buf()),
        ];

        for (unit, base) in &cases {
            let r = RelocationExecutor::new().relocate(unit, base, &policy);

            assert_eq!(r.outcome, Outcome::Failed, "{}", base.display());
            assert!(!r.degraded);
            assert!(r.detail.contains("overlaps the source"), "{}", r.detail);
        }
        assert_eq!(fs::read_to_string(source.join("precious.txt")).unwrap(), "keep me");
        assert_eq!(fs::read_to_string(source.join("Zalo/nested.txt")).unwrap(), "nested");
        assert!(!platform::is_redirect(&source));
    }

    #[test]
    fn backup_is_made_before_moving() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);

        let r = RelocationExecutor::new().relocate(&unit, &dest, &RelocationPolicy::default());

        assert_eq!(r.outcome, Outcome::Moved, "{}", r.detail);
        let backup = crate::backup::backup_path(&unit.source);
        assert_eq!(fs::read(backup.join("cache.bin")).unwrap(), vec![9; 64]);
        assert!(!platform::is_redirect(&backup));
    }

    #[test]
    fn existing_backup_declined_skips_whole_unit() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);
        td.child("home/ZaloData.old/x").write_str("older").unwrap();

        let r = RelocationExecutor::new().relocate(&unit, &dest, &RelocationPolicy::default());

        assert_eq!(r.outcome, Outcome::Skipped);
        assert!(!dest.join("ZaloData").exists());
        assert!(!platform::is_redirect(&unit.source));
    }

    #[cfg(unix)]
    #[test]
    fn backup_failure_leaves_source_untouched() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);
        let _sock = std::os::unix::net::UnixListener::bind(unit.source.join("ipc")).unwrap();

        let r = RelocationExecutor::new().relocate(&unit, &dest, &RelocationPolicy::default());

        assert_eq!(r.outcome, Outcome::Failed);
        assert!(!r.degraded);
        assert!(!platform::is_redirect(&unit.source));
        assert!(unit.source.join("cache.bin").exists());
        assert!(!dest.join("ZaloData").exists());
    }

    #[test]
    fn redirect_failure_is_degraded_and_not_rolled_back() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);

        let r = RelocationExecutor::with_redirector(FailingRedirector)
            .relocate(&unit, &dest, &no_backup());

        assert_eq!(r.outcome, Outcome::Failed);
        assert!(r.degraded);
        assert!(r.detail.contains("junctions disabled"));
        assert!(dest.join("ZaloData/cache.bin").exists(), "data stays at destination");
        assert!(fs::symlink_metadata(&unit.source).is_err(), "no redirect, no source");
    }

    #[cfg(unix)]
    #[test]
    fn wrong_redirect_target_fails_verification() {
        let td = assert_fs::TempDir::new().unwrap();
        let (unit, dest) = setup(&td);
        let elsewhere = td.child("elsewhere");
        elsewhere.create_dir_all().unwrap();

        let redirector = MisdirectingRedirector(elsewhere.path().to_path_buf());
        let r =
            RelocationExecutor::with_redirector(redirector).relocate(&unit, &dest, &no_backup());

        assert_eq!(r.outcome, Outcome::Failed);
        assert!(r.degraded);
        assert!(r.detail.contains("instead of"));
    }

    #[cfg(unix)]
    #[test]
    fn already_redirected_source_is_skipped() {
        let td = assert_fs::TempDir::new().unwrap();
        let real = td.child("real");
        real.create_dir_all().unwrap();
        let link = td.path().join("Zalo");
        std::os::unix::fs::symlink(real.path(), &link).unwrap();
        let unit = RelocationUnit::new("Zalo", &link);

        let dest = td.path().join("D");
        let r = RelocationExecutor::new().relocate(&unit, &dest, &RelocationPolicy::default());

        assert_eq!(r.outcome, Outcome::Skipped);
        assert!(!td.path().join("Zalo.old").exists());
    }

    #[test]
    fn regular_file_source_is_refused() {
        let td = assert_fs::TempDir::new().unwrap();
        let f = td.child("Zalo");
        f.write_str("not a dir").unwrap();
        let unit = RelocationUnit::new("Zalo", f.path());

        let r = RelocationExecutor::new().relocate(&unit, &td.path().join("D"), &no_backup());

        assert_eq!(r.outcome, Outcome::Failed);
        assert!(f.path().is_file());
    }
}
