//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Flags given on the command line override values from config.xml.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::relocate::{ConflictPolicy, RelocationPolicy};

/// Relocate Zalo data folders to another drive and leave redirects behind.
/// CLI flags override config values (which are loaded from XML).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Move Zalo data folders to another drive, leaving junctions/symlinks behind"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Use this config file instead of ZALO_MOVE_CONFIG or the default location.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Print where zalo_move will look for the config file, then exit.
    #[arg(long, help = "Print the config file location used by zalo_move and exit")]
    pub print_config: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print results as JSON on stdout instead of human-readable lines.
    #[arg(long, global = true, help = "Print the final report as JSON")]
    pub report_json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show every configured folder: path, presence, size, redirect state.
    Status,
    /// Move folders to DEST and leave redirects at their old locations.
    Move(MoveArgs),
    /// Report (and optionally terminate) running processes that lock the folders.
    CheckProcess {
        /// Terminate matching processes.
        #[arg(long)]
        kill: bool,
    },
    /// Manage the `.old` backups made before moving.
    Backups {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct MoveArgs {
    /// Destination folder; defaults to destination_base from config.xml.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dest: Option<PathBuf>,

    /// Folder to move (repeatable). Default: every configured folder that can be moved.
    #[arg(long = "unit", value_name = "NAME")]
    pub units: Vec<String>,

    /// Replace a folder that already exists at the destination.
    #[arg(long)]
    pub overwrite_dest: bool,

    /// Replace an existing `.old` backup.
    #[arg(long)]
    pub overwrite_backup: bool,

    /// Do not back up folders before moving them.
    #[arg(long)]
    pub no_backup: bool,

    /// Move directly into DEST instead of DEST/<destination_subdir>.
    #[arg(long)]
    pub no_subdir: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BackupAction {
    /// List existing backups.
    List,
    /// Delete the listed backups after confirmation.
    Purge {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(Command::Move(m)) = &self.command {
            if m.no_backup {
                cfg.make_backup = false;
            }
            if let Some(dest) = &m.dest {
                cfg.destination_base = Some(dest.clone());
            }
        }
    }
}

impl MoveArgs {
    /// Relocation policy from flags, with backups on when the config says so.
    pub fn policy(&self, make_backup: bool) -> RelocationPolicy {
        let pick = |overwrite| {
            if overwrite {
                ConflictPolicy::Overwrite
            } else {
                ConflictPolicy::Skip
            }
        };
        RelocationPolicy {
            on_destination_exists: pick(self.overwrite_dest),
            on_backup_exists: pick(self.overwrite_backup),
            make_backup: make_backup && !self.no_backup,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
