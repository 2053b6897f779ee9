//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::paths;
use super::{DESTINATION_SUBDIR_DEFAULT, SETTLE_MS_DEFAULT};
use crate::process_guard::DEFAULT_PROCESS_PATTERN;
use crate::relocate::RelocationUnit;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// The three Zalo folders, under the current user's local and roaming data dirs.
/// Units whose base directory cannot be determined are left out.
pub fn default_units() -> Vec<RelocationUnit> {
    let mut units = Vec::new();
    if let Some(local) = dirs::data_local_dir() {
        units.push(RelocationUnit::new("Zalo", local.join("Programs").join("Zalo")));
        units.push(RelocationUnit::new("ZaloPC", local.join("ZaloPC")));
    }
    if let Some(roaming) = dirs::data_dir() {
        units.push(RelocationUnit::new("ZaloData", roaming.join("ZaloData")));
    }
    units
}

/// Runtime configuration for the relocation front end.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Relocatable units, in display and default processing order
    pub units: Vec<RelocationUnit>,
    /// Preferred destination when `--dest` is not given
    pub destination_base: Option<PathBuf>,
    /// Folder created inside the chosen destination
    pub destination_subdir: String,
    /// Substring identifying processes that hold unit files open
    pub process_name: String,
    /// Back up each unit to `<source>.old` before moving it
    pub make_backup: bool,
    /// Pause after terminating blocking processes
    #[serde(serialize_with = "ser_millis")]
    pub settle_after_kill: Duration,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

fn ser_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: default_units(),
            destination_base: None,
            destination_subdir: DESTINATION_SUBDIR_DEFAULT.to_string(),
            process_name: DEFAULT_PROCESS_PATTERN.to_string(),
            make_backup: true,
            settle_after_kill: Duration::from_millis(SETTLE_MS_DEFAULT),
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
        }
    }
}

impl Config {
    /// Final destination base for a user-chosen folder: `<chosen>/<destination_subdir>`,
    /// or `chosen` itself when `use_subdir` is false.
    pub fn destination_for(&self, chosen: &Path, use_subdir: bool) -> PathBuf {
        if use_subdir {
            chosen.join(&self.destination_subdir)
        } else {
            chosen.to_path_buf()
        }
    }

    pub fn unit(&self, name: &str) -> Option<&RelocationUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}
