//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the Ctrl-C handler, takes the
//! instance lock for commands that change the filesystem, then dispatches.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use zalo_move::cli::{Args, BackupAction, Command, MoveArgs};
use zalo_move::config::CONFIG_ENV_VAR;
use zalo_move::fs_ops::{InstanceLock, try_acquire_instance_lock};
use zalo_move::output as out;
use zalo_move::{
    BatchEvent, BatchRunner, Config, ProcessGuard, RelocationRequest, default_config_path,
    inspect_all, list_backups, load_config, purge, shutdown,
};

use crate::logging::init_tracing;

/// Run the CLI application. The exit code is non-zero when any unit failed.
pub fn run(args: Args) -> Result<ExitCode> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location(&args);
        return Ok(ExitCode::SUCCESS);
    }

    let loaded = load_config(args.config.as_deref())?;
    if loaded.created_template {
        out::print_success(&format!(
            "A template zalo_move config was written to: {}",
            loaded.path.display()
        ));
        out::print_info(
            "Edit <units> there if your Zalo folders live elsewhere. \
             Built-in defaults are used for now.",
        );
    }
    let mut cfg = loaded.config;
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing the current folder, then stopping...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .expect("failed to install signal handler");
    }

    debug!(config = %loaded.path.display(), ?args, "starting zalo_move");

    let command = args.command.clone().unwrap_or(Command::Status);
    let lock_dir = loaded.path.parent().map(Path::to_path_buf);
    let result = (|| -> Result<ExitCode> {
        match &command {
            Command::Status => cmd_status(&cfg, args.report_json),
            Command::CheckProcess { kill } => {
                let _lock = if *kill { Some(instance_lock(lock_dir.as_deref())?) } else { None };
                cmd_check_process(&cfg, *kill, args.report_json)
            }
            Command::Move(m) => {
                let _lock = instance_lock(lock_dir.as_deref())?;
                cmd_move(&cfg, m, args.report_json)
            }
            Command::Backups {
                action: BackupAction::List,
            } => cmd_backups_list(&cfg, args.report_json),
            Command::Backups {
                action: BackupAction::Purge { yes },
            } => {
                let _lock = instance_lock(lock_dir.as_deref())?;
                cmd_backups_purge(&cfg, *yes, args.report_json)
            }
        }
    })();

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "command failed");
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn print_config_location(args: &Args) {
    if let Some(p) = &args.config {
        out::print_info(&format!("Using --config (explicit):\n  {}\n", p.display()));
        return;
    }
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV_VAR) {
        out::print_info(&format!("Using {CONFIG_ENV_VAR} (explicit):\n  {cfg_env}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV_VAR} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default zalo_move config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run any command to create a template.",
                );
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

fn instance_lock(dir: Option<&Path>) -> Result<InstanceLock> {
    let dir = dir.ok_or_else(|| anyhow!("config path has no parent directory for the lock file"))?;
    try_acquire_instance_lock(dir)
        .with_context(|| format!("acquire instance lock in '{}'", dir.display()))?
        .ok_or_else(|| anyhow!("another zalo_move instance is already running"))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    out::print_user(&serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_status(cfg: &Config, report_json: bool) -> Result<ExitCode> {
    let rows = inspect_all(&cfg.units);
    if report_json {
        let rows: Vec<_> = rows
            .iter()
            .map(|(u, s)| {
                json!({
                    "name": u.name,
                    "source": u.source,
                    "exists": s.exists,
                    "size_bytes": s.size_bytes,
                    "is_redirect": s.is_redirect,
                    "eligible": s.is_eligible(),
                })
            })
            .collect();
        print_json(&rows)?;
    } else if rows.is_empty() {
        out::print_warn("No folders are configured.");
    } else {
        for (unit, status) in &rows {
            out::print_user(&out::status_line(unit, status));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check_process(cfg: &Config, kill: bool, report_json: bool) -> Result<ExitCode> {
    let mut guard = ProcessGuard::new(cfg.process_name.clone());
    let running = guard.is_blocking_process_running();
    let termination = (kill && running).then(|| guard.terminate_blocking_processes());

    if report_json {
        print_json(&json!({
            "pattern": guard.pattern(),
            "running": running,
            "termination": termination,
        }))?;
    } else if !running {
        out::print_success(&format!("No process matching '{}' is running.", guard.pattern()));
    } else if let Some(report) = termination {
        if report.is_partial() {
            out::print_warn(&format!(
                "Terminated {} of {} '{}' processes; close the rest manually.",
                report.terminated,
                report.matched,
                guard.pattern()
            ));
        } else {
            out::print_success(&format!(
                "Terminated {} '{}' processes.",
                report.terminated,
                guard.pattern()
            ));
        }
    } else {
        out::print_warn(&format!(
            "'{}' is running and may lock its folders. Close it or re-run with --kill.",
            guard.pattern()
        ));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_move(cfg: &Config, m: &MoveArgs, report_json: bool) -> Result<ExitCode> {
    let chosen = m
        .dest
        .clone()
        .or_else(|| cfg.destination_base.clone())
        .ok_or_else(|| {
            anyhow!("no destination: pass --dest DIR or set destination_base in config.xml")
        })?;
    let destination_base = cfg.destination_for(&chosen, !m.no_subdir);
    let units = if m.units.is_empty() {
        cfg.units.iter().map(|u| u.name.clone()).collect()
    } else {
        m.units.clone()
    };

    let request = RelocationRequest {
        destination_base,
        units,
        policy: m.policy(cfg.make_backup),
        settle_after_kill: cfg.settle_after_kill,
    };
    let mut runner = BatchRunner::new(cfg.units.clone(), cfg.process_name.clone());

    let summary = runner
        .run_batch(&request, |event| {
            if report_json {
                return;
            }
            match event {
                BatchEvent::BlockersTerminated(r) if r.is_partial() => out::print_warn(&format!(
                    "Terminated {} of {} blocking processes; some files may still be in use.",
                    r.terminated, r.matched
                )),
                BatchEvent::BlockersTerminated(r) => {
                    out::print_info(&format!("Terminated {} blocking processes.", r.terminated))
                }
                BatchEvent::UnitFinished {
                    index,
                    total,
                    result,
                } => out::print_progress(*index, *total, result),
            }
        })
        .map_err(|e| {
            error!(code = e.code(), error = %e, "batch rejected");
            anyhow!(e)
        })?;

    if report_json {
        print_json(&summary)?;
    } else {
        out::print_user(&format!(
            "Moved {}, skipped {}, failed {}.",
            summary.moved, summary.skipped, summary.failed
        ));
        for r in summary.results.iter().filter(|r| r.degraded) {
            out::print_error(&format!("{}: {}", r.name, r.detail));
        }
        if shutdown::is_requested() {
            out::print_warn("Interrupted: remaining folders were not touched.");
        }
    }

    if summary.has_failures() {
        warn!(failed = summary.failed, "batch finished with failures");
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_backups_list(cfg: &Config, report_json: bool) -> Result<ExitCode> {
    let backups = list_backups(&cfg.units);
    if report_json {
        print_json(&backups)?;
    } else if backups.is_empty() {
        out::print_info("No backups found.");
    } else {
        for b in &backups {
            out::print_user(&format!("{:<10} {}", b.name, b.path.display()));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_backups_purge(cfg: &Config, yes: bool, report_json: bool) -> Result<ExitCode> {
    let backups = list_backups(&cfg.units);
    if backups.is_empty() {
        if report_json {
            print_json(&zalo_move::PurgeReport::default())?;
        } else {
            out::print_info("No backups found.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !yes {
        if report_json {
            bail!("--report-json with purge requires --yes");
        }
        out::print_user("These backups will be deleted:");
        for b in &backups {
            out::print_user(&format!("  {}", b.path.display()));
        }
        if !out::confirm("Delete them?")? {
            out::print_info("Nothing deleted.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let report = purge(&backups);
    if report_json {
        print_json(&report)?;
    } else {
        for p in &report.deleted {
            out::print_success(&format!("deleted {}", p.display()));
        }
        for (p, e) in &report.errors {
            out::print_error(&format!("could not delete {}: {e}", p.display()));
        }
    }
    Ok(if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
