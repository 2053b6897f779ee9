//! zalo_move library crate.
//! Relocates named application data folders to another location and leaves a
//! junction (Windows) or directory symlink (Unix) at each old path.
//!
//! Layout:
//! - `relocate`: executor and batch orchestrator
//! - `inspect`, `backup`, `process_guard`: the pieces a batch is built from
//! - `config`, `cli`, `output`: the front end used by the binary
//! - `fs_ops`, `platform`: filesystem plumbing

pub mod backup;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod inspect;
pub mod output;
pub mod platform;
pub mod process_guard;
pub mod relocate;
pub mod shutdown;
mod utils;

pub use backup::{backup_path, create_backup, list_backups, purge, BackupEntry, PurgeReport};
pub use config::types::{Config, LogLevel};
pub use config::{
    default_config_path, default_log_path, load_config, load_config_from_xml_path,
    path_has_symlink_ancestor,
};
pub use errors::{BatchError, RelocateError};
pub use inspect::{inspect, inspect_all};
pub use process_guard::{ProcessGuard, ProcessTable, SystemProcessTable};
pub use relocate::{
    BatchEvent, BatchRunner, BatchSummary, ConflictPolicy, Outcome, RelocationExecutor,
    RelocationPolicy, RelocationRequest, RelocationResult, RelocationUnit, UnitStatus,
};
