//! Relocation & Redirection Engine.

mod batch;
mod executor;
mod types;

pub use batch::BatchRunner;
pub use executor::{PlatformRedirector, Redirector, RelocationExecutor};
pub use types::{
    BatchEvent, BatchSummary, ConflictPolicy, Outcome, RelocationPolicy, RelocationRequest,
    RelocationResult, RelocationUnit, TerminationReport, UnitStatus,
};
