//! Relocation data model: units, requests, per-unit results and batch summaries.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::RelocateError;

/// One named, independently relocatable directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationUnit {
    pub name: String,
    pub source: PathBuf,
}

impl RelocationUnit {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Where this unit lands under `destination_base`.
    pub fn destination_in(&self, destination_base: &Path) -> PathBuf {
        destination_base.join(&self.name)
    }
}

/// Snapshot of a unit's source path. Recompute after any mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub exists: bool,
    pub size_bytes: u64,
    pub is_redirect: bool,
}

impl UnitStatus {
    pub fn is_eligible(&self) -> bool {
        self.exists && !self.is_redirect
    }
}

/// Caller's answer to "the target path already exists".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ConflictPolicy {
    Overwrite,
    #[default]
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelocationPolicy {
    pub on_destination_exists: ConflictPolicy,
    pub on_backup_exists: ConflictPolicy,
    pub make_backup: bool,
}

impl Default for RelocationPolicy {
    fn default() -> Self {
        Self {
            on_destination_exists: ConflictPolicy::Skip,
            on_backup_exists: ConflictPolicy::Skip,
            make_backup: true,
        }
    }
}

/// Input to one batch run.
#[derive(Debug, Clone)]
pub struct RelocationRequest {
    pub destination_base: PathBuf,
    /// Unit names, processed in this order.
    pub units: Vec<String>,
    pub policy: RelocationPolicy,
    /// Pause after blocking processes were terminated, before the first move.
    pub settle_after_kill: Duration,
}

impl RelocationRequest {
    pub fn new(destination_base: impl Into<PathBuf>, units: Vec<String>) -> Self {
        Self {
            destination_base: destination_base.into(),
            units,
            policy: RelocationPolicy::default(),
            settle_after_kill: Duration::ZERO,
        }
    }

    pub fn with_policy(mut self, policy: RelocationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Skipped,
    Moved,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Skipped => "skipped",
            Outcome::Moved => "moved",
            Outcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal record for one unit of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationResult {
    pub name: String,
    pub outcome: Outcome,
    pub detail: String,
    /// Where the data lives now, when it was moved (including degraded moves).
    pub destination: Option<PathBuf>,
    /// Data was moved but the old path does not redirect to it.
    pub degraded: bool,
}

impl RelocationResult {
    pub fn moved(name: &str, destination: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Moved,
            detail: format!("moved to {}", destination.display()),
            destination: Some(destination),
            degraded: false,
        }
    }

    pub fn skipped(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Skipped,
            detail: detail.into(),
            destination: None,
            degraded: false,
        }
    }

    /// Map a per-unit error onto Skipped or Failed.
    pub fn from_error(name: &str, err: &RelocateError) -> Self {
        let outcome = if err.is_skip() {
            Outcome::Skipped
        } else {
            Outcome::Failed
        };
        let destination = match err {
            RelocateError::RedirectFailed { target, .. } => Some(target.clone()),
            _ => None,
        };
        Self {
            name: name.to_string(),
            outcome,
            detail: err.to_string(),
            destination,
            degraded: err.is_degraded(),
        }
    }
}

/// What a Process Guard sweep found and killed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    pub matched: usize,
    pub terminated: usize,
}

impl TerminationReport {
    /// Some matched processes could not be killed.
    pub fn is_partial(&self) -> bool {
        self.terminated < self.matched
    }
}

/// Ordered outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub results: Vec<RelocationResult>,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Present when blocking processes were found before the first unit.
    pub termination: Option<TerminationReport>,
}

impl BatchSummary {
    pub(crate) fn push(&mut self, result: RelocationResult) {
        match result.outcome {
            Outcome::Moved => self.moved += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
        self.results.push(result);
    }

    /// Any failure means the caller should treat the batch as partially failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.results.iter().map(|r| r.outcome).collect()
    }
}

/// Progress notifications emitted by the batch orchestrator.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Informational: blocking processes were found and killed before the first unit.
    BlockersTerminated(TerminationReport),
    /// Exactly one per unit, in request order. `index` is 1-based.
    UnitFinished {
        index: usize,
        total: usize,
        result: &'a RelocationResult,
    },
}
