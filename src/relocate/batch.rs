//! Batch Orchestrator: run the executor over an ordered list of units.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::executor::{PlatformRedirector, Redirector, RelocationExecutor};
use super::types::{BatchEvent, BatchSummary, RelocationRequest, RelocationResult, RelocationUnit};
use crate::errors::{BatchError, RelocateError};
use crate::fs_ops::describe_io_error;
use crate::inspect::inspect;
use crate::process_guard::{ProcessGuard, ProcessTable, SystemProcessTable};
use crate::shutdown;
use crate::utils::{is_writable_probe, path_is_within};

/// Owns the configured units and the collaborators a batch needs.
#[derive(Debug)]
pub struct BatchRunner<T: ProcessTable = SystemProcessTable, R: Redirector = PlatformRedirector> {
    units: Vec<RelocationUnit>,
    guard: ProcessGuard<T>,
    executor: RelocationExecutor<R>,
}

impl BatchRunner {
    /// Production runner: `sysinfo` process table and platform redirects.
    pub fn new(units: Vec<RelocationUnit>, process_pattern: impl Into<String>) -> Self {
        Self::with_parts(units, ProcessGuard::new(process_pattern), RelocationExecutor::new())
    }
}

impl<T: ProcessTable, R: Redirector> BatchRunner<T, R> {
    pub fn with_parts(
        units: Vec<RelocationUnit>,
        guard: ProcessGuard<T>,
        executor: RelocationExecutor<R>,
    ) -> Self {
        Self {
            units,
            guard,
            executor,
        }
    }

    pub fn units(&self) -> &[RelocationUnit] {
        &self.units
    }

    pub fn guard_mut(&mut self) -> &mut ProcessGuard<T> {
        &mut self.guard
    }

    /// Relocate the requested units in order, reporting each one through `on_event`.
    ///
    /// Returns `Err` only for caller-input problems, before anything on disk is
    /// touched. Per-unit failures never stop the batch; `results` always has one
    /// entry per requested unit.
    pub fn run_batch(
        &mut self,
        request: &RelocationRequest,
        mut on_event: impl FnMut(&BatchEvent<'_>),
    ) -> Result<BatchSummary, BatchError> {
        let selected = self.resolve_units(&request.units)?;
        let destination_base = self.prepare_destination(&request.destination_base, &selected)?;

        // Eligibility is decided once, up front. A unit that disappears later
        // still reaches the executor and fails there.
        let snapshot: Vec<_> = selected
            .into_iter()
            .map(|u| {
                let status = inspect(&u);
                (u, status)
            })
            .collect();
        let total = snapshot.len();
        let mut summary = BatchSummary::default();

        if snapshot.iter().any(|(_, s)| s.is_eligible()) {
            let report = self.guard.terminate_blocking_processes();
            if report.matched > 0 {
                if report.is_partial() {
                    warn!(
                        pattern = self.guard.pattern(),
                        matched = report.matched,
                        terminated = report.terminated,
                        "some blocking processes could not be terminated; files may still be in use"
                    );
                } else {
                    info!(terminated = report.terminated, "blocking processes terminated");
                }
                summary.termination = Some(report);
                on_event(&BatchEvent::BlockersTerminated(report));
                if report.terminated > 0 && !request.settle_after_kill.is_zero() {
                    debug!(
                        settle_ms = request.settle_after_kill.as_millis() as u64,
                        "waiting for handles to be released"
                    );
                    std::thread::sleep(request.settle_after_kill);
                }
            }
        }

        for (i, (unit, status)) in snapshot.iter().enumerate() {
            let result = if shutdown::is_requested() {
                RelocationResult::from_error(&unit.name, &RelocateError::Interrupted)
            } else if !status.exists {
                RelocationResult::skipped(&unit.name, "source not present")
            } else if status.is_redirect {
                let err = RelocateError::AlreadyRedirected(unit.source.clone());
                RelocationResult::from_error(&unit.name, &err)
            } else {
                info!(unit = %unit.name, index = i + 1, total, "relocating unit");
                self.executor.relocate(unit, &destination_base, &request.policy)
            };
            on_event(&BatchEvent::UnitFinished {
                index: i + 1,
                total,
                result: &result,
            });
            summary.push(result);
        }

        info!(
            moved = summary.moved,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    }

    fn resolve_units(&self, names: &[String]) -> Result<Vec<RelocationUnit>, BatchError> {
        if names.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let mut seen = HashSet::new();
        names
            .iter()
            .map(|name| {
                if !seen.insert(name.as_str()) {
                    return Err(BatchError::DuplicateUnit(name.clone()));
                }
                self.units
                    .iter()
                    .find(|u| &u.name == name)
                    .cloned()
                    .ok_or_else(|| BatchError::UnknownUnit(name.clone()))
            })
            .collect()
    }

    /// Absolute, existing, writable destination base outside every selected source,
    /// whose per-unit target is never the source itself or one of its parents.
    fn prepare_destination(
        &self,
        base: &Path,
        selected: &[RelocationUnit],
    ) -> Result<PathBuf, BatchError> {
        let invalid = |reason: String| BatchError::DestinationInvalid {
            path: base.to_path_buf(),
            reason,
        };
        if base.as_os_str().is_empty() {
            return Err(invalid("empty path".into()));
        }
        let base = std::path::absolute(base).map_err(|e| invalid(e.to_string()))?;

        if let Some(unit) = selected.iter().find(|u| path_is_within(&base, &u.source)) {
            return Err(BatchError::DestinationInsideSource {
                destination: base,
                unit: unit.name.clone(),
            });
        }
        if let Some(unit) = selected
            .iter()
            .find(|u| path_is_within(&u.source, &u.destination_in(&base)))
        {
            return Err(BatchError::DestinationOverlapsSource {
                destination: unit.destination_in(&base),
                unit: unit.name.clone(),
            });
        }

        fs::create_dir_all(&base)
            .map_err(|e| invalid(describe_io_error("create destination", &base, &e)))?;
        if !base.is_dir() {
            return Err(invalid("not a directory".into()));
        }
        is_writable_probe(&base)
            .map_err(|e| invalid(describe_io_error("write to destination", &base, &e)))?;
        Ok(base)
    }
}
