//! Typed error definitions for zalo_move.
//! Per-unit failures are captured into a `RelocationResult`; batch-level errors
//! are caller-input problems detected before any unit is touched.

use std::path::PathBuf;
use thiserror::Error;

/// Failure (or skip reason) for a single relocation unit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelocateError {
    #[error("source not found: {0}")]
    NotFound(PathBuf),

    #[error("already redirected: {0}")]
    AlreadyRedirected(PathBuf),

    #[error("{what} already exists and overwrite was declined: {path}")]
    ConflictUnresolved { path: PathBuf, what: &'static str },

    #[error("backup copy to {path} failed: {reason}")]
    CopyFailed { path: PathBuf, reason: String },

    #[error("move {from} -> {to} failed: {reason}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// Data already lives at `target`; the redirect at `link` is missing or wrong.
    #[error(
        "data moved to {target} but redirect at {link} could not be created: {reason}; \
         finish manually by linking {link} -> {target}"
    )]
    RedirectFailed {
        link: PathBuf,
        target: PathBuf,
        reason: String,
    },

    #[error("interrupted before this unit started")]
    Interrupted,
}

impl RelocateError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            RelocateError::NotFound(_) => 10,
            RelocateError::AlreadyRedirected(_) => 11,
            RelocateError::ConflictUnresolved { .. } => 12,
            RelocateError::CopyFailed { .. } => 20,
            RelocateError::MoveFailed { .. } => 21,
            RelocateError::RedirectFailed { .. } => 22,
            RelocateError::Interrupted => 30,
        }
    }

    /// Skip reasons are not failures: the unit was left exactly as it was.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            RelocateError::AlreadyRedirected(_)
                | RelocateError::ConflictUnresolved { .. }
                | RelocateError::Interrupted
        )
    }

    /// True when the tree was moved but the old path does not redirect to it.
    pub fn is_degraded(&self) -> bool {
        matches!(self, RelocateError::RedirectFailed { .. })
    }
}

/// Caller-input errors reported by the batch orchestrator before any unit is touched.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no units requested")]
    EmptyBatch,

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("unit requested more than once: {0}")]
    DuplicateUnit(String),

    #[error("destination base {path} is unusable: {reason}")]
    DestinationInvalid { path: PathBuf, reason: String },

    #[error("destination base {destination} lies inside the source of unit '{unit}'")]
    DestinationInsideSource { destination: PathBuf, unit: String },

    #[error(
        "unit '{unit}' would be moved to {destination}, \
         which is its own source or a parent of it"
    )]
    DestinationOverlapsSource { destination: PathBuf, unit: String },
}

impl BatchError {
    pub fn code(&self) -> u16 {
        match self {
            BatchError::EmptyBatch => 40,
            BatchError::UnknownUnit(_) => 41,
            BatchError::DuplicateUnit(_) => 42,
            BatchError::DestinationInvalid { .. } => 43,
            BatchError::DestinationInsideSource { .. } => 44,
            BatchError::DestinationOverlapsSource { .. } => 45,
        }
    }
}
