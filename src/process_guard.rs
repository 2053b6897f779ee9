//! Process Guard: find and force-kill processes that may hold a unit's files open.
//!
//! Best-effort by contract:
//! - a process whose entry cannot be read is skipped, the scan goes on;
//! - a kill that fails is counted as not terminated, the sweep goes on;
//! - termination does not wait for handles to be released.

use std::io;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

use crate::relocate::TerminationReport;

/// Product name matched against process names by default.
pub const DEFAULT_PROCESS_PATTERN: &str = "Zalo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Source of running processes. Production uses `SystemProcessTable`.
pub trait ProcessTable {
    /// One item per process; an Err is an entry that could not be read.
    fn processes(&mut self) -> Vec<io::Result<ProcessEntry>>;

    /// Forcefully terminate `pid`.
    fn kill(&mut self, pid: u32) -> io::Result<()>;
}

/// `sysinfo`-backed process table.
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProcessTable").finish_non_exhaustive()
    }
}

impl ProcessTable for SystemProcessTable {
    fn processes(&mut self) -> Vec<io::Result<ProcessEntry>> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        self.system
            .processes()
            .iter()
            .map(|(pid, p)| {
                Ok(ProcessEntry {
                    pid: pid.as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                })
            })
            .collect()
    }

    fn kill(&mut self, pid: u32) -> io::Result<()> {
        let Some(process) = self.system.process(Pid::from_u32(pid)) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "process already exited"));
        };
        if process.kill() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "kill signal was refused",
            ))
        }
    }
}

/// Detects and terminates processes whose name contains `pattern` (case-sensitive).
#[derive(Debug)]
pub struct ProcessGuard<T: ProcessTable = SystemProcessTable> {
    table: T,
    pattern: String,
    own_pid: u32,
}

impl ProcessGuard<SystemProcessTable> {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self::with_table(pattern, SystemProcessTable::new())
    }
}

impl<T: ProcessTable> ProcessGuard<T> {
    pub fn with_table(pattern: impl Into<String>, table: T) -> Self {
        Self {
            table,
            pattern: pattern.into(),
            own_pid: std::process::id(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn matching(&mut self) -> Vec<ProcessEntry> {
        if self.pattern.is_empty() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for item in self.table.processes() {
            match item {
                Ok(p) if p.pid != self.own_pid && p.name.contains(&self.pattern) => found.push(p),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unreadable process entry"),
            }
        }
        found
    }

    pub fn is_blocking_process_running(&mut self) -> bool {
        !self.matching().is_empty()
    }

    /// Kill every matching process; `terminated` counts only successful kills.
    pub fn terminate_blocking_processes(&mut self) -> TerminationReport {
        let targets = self.matching();
        let mut report = TerminationReport {
            matched: targets.len(),
            terminated: 0,
        };
        for p in targets {
            match self.table.kill(p.pid) {
                Ok(()) => {
                    info!(pid = p.pid, name = %p.name, "terminated blocking process");
                    report.terminated += 1;
                }
                Err(e) => {
                    warn!(pid = p.pid, name = %p.name, error = %e, "could not terminate process")
                }
            }
        }
        report
    }
}
