//! User-facing console lines: prefixed, colored on a TTY, plain otherwise.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

use crate::fs_ops::format_bytes;
use crate::relocate::{Outcome, RelocationResult, RelocationUnit, UnitStatus};

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix).
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// `[i/n] name: outcome - detail`, one per finished unit.
pub fn print_progress(index: usize, total: usize, result: &RelocationResult) {
    let tag = result.outcome.to_string();
    let tag = if !is_tty() {
        tag
    } else {
        match result.outcome {
            Outcome::Moved => tag.green().bold().to_string(),
            Outcome::Skipped => tag.yellow().to_string(),
            Outcome::Failed => tag.red().bold().to_string(),
        }
    };
    let degraded = if result.degraded { " (NOT REDIRECTED)" } else { "" };
    println!("[{index}/{total}] {}: {tag}{degraded} - {}", result.name, result.detail);
}

/// One `status` row for a unit.
pub fn status_line(unit: &RelocationUnit, status: &UnitStatus) -> String {
    let state = match (status.exists, status.is_redirect) {
        (false, _) => "not found".to_string(),
        (true, true) => "already redirected".to_string(),
        (true, false) => format!("present, {}", format_bytes(status.size_bytes)),
    };
    format!("{:<10} {:<20} {}", unit.name, state, unit.source.display())
}

/// Ask a yes/no question on stdin; anything but y/yes is "no".
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
