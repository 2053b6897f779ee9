//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template at the default location when it is missing.
//!
//! Notes:
//! - Unknown XML fields are rejected so typos surface instead of being ignored.
//! - A file that lists no units falls back to the built-in Zalo folders.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use quick_xml::escape::escape;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{default_units, Config, LogLevel};
use super::{CONFIG_ENV_VAR, DESTINATION_SUBDIR_DEFAULT, SETTLE_MS_DEFAULT};
use crate::fs_ops::io_error_with_help;
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};
use crate::process_guard::DEFAULT_PROCESS_PATTERN;
use crate::relocate::RelocationUnit;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config", deny_unknown_fields)]
struct XmlConfig {
    destination_base: Option<String>,
    destination_subdir: Option<String>,
    process_name: Option<String>,
    make_backup: Option<String>,
    settle_ms: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    units: Option<XmlUnits>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlUnits {
    #[serde(default)]
    unit: Vec<XmlUnit>,
}

/// `<unit name="ZaloPC">C:\Users\me\AppData\Local\ZaloPC</unit>`
#[derive(Debug, Deserialize)]
struct XmlUnit {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text", default)]
    path: String,
}

/// A config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// A template was written to `path` during this load.
    pub created_template: bool,
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => bail!("{field}: expected true or false, got '{other}'"),
    }
}

// Map XmlConfig -> Config, falling back to defaults for absent or empty fields.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    let units: Vec<RelocationUnit> = parsed
        .units
        .unwrap_or_default()
        .unit
        .into_iter()
        .map(|u| RelocationUnit::new(u.name.trim(), PathBuf::from(u.path.trim())))
        .collect();
    if !units.is_empty() {
        cfg.units = units;
    }

    cfg.destination_base = non_empty(parsed.destination_base.as_deref()).map(PathBuf::from);
    if let Some(sub) = non_empty(parsed.destination_subdir.as_deref()) {
        cfg.destination_subdir = sub.to_string();
    }
    if let Some(name) = parsed.process_name.as_deref() {
        cfg.process_name = name.trim().to_string();
    }
    if let Some(raw) = non_empty(parsed.make_backup.as_deref()) {
        cfg.make_backup = parse_bool("make_backup", raw)?;
    }
    if let Some(raw) = non_empty(parsed.settle_ms.as_deref()) {
        let ms: u64 = raw
            .parse()
            .map_err(|_| anyhow!("settle_ms: expected milliseconds, got '{raw}'"))?;
        cfg.settle_after_kill = Duration::from_millis(ms);
    }
    if let Some(raw) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = raw.parse::<LogLevel>().map_err(|e| anyhow!("log_level: {e}"))?;
    }
    if let Some(lf) = non_empty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(lf));
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in '{}'", path.display()))
}

/// Resolve, load and validate the configuration.
///
/// Path precedence: `explicit` (the `--config` flag), then `$ZALO_MOVE_CONFIG`,
/// then the OS default. A missing explicit or env-named file is an error; a
/// missing default file is created from the template and defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let env_set = env::var_os(CONFIG_ENV_VAR).is_some_and(|v| !v.is_empty());
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let (config, created_template) = if path.exists() {
        (load_config_from_xml_path(&path)?, false)
    } else if explicit.is_some() || env_set {
        bail!("config file not found: {}", path.display());
    } else {
        let created = match create_template_config(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not create template config; using defaults"
                );
                false
            }
        };
        (Config::default(), created)
    };

    config.validate()?;
    Ok(LoadedConfig {
        config,
        path,
        created_template,
    })
}

fn render_template() -> String {
    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let units: String = default_units()
        .iter()
        .map(|u| {
            format!(
                "    <unit name=\"{}\">{}</unit>\n",
                escape(u.name.as_str()),
                escape(u.source.display().to_string().as_str())
            )
        })
        .collect();

    format!(
        "<!--\n  zalo_move configuration (XML)\n\n  \
         destination_base    -> default destination when none is passed (optional)\n  \
         destination_subdir  -> subfolder of destination (default {DESTINATION_SUBDIR_DEFAULT})\n  \
         process_name        -> processes whose name contains this are terminated before moving\n  \
         make_backup         -> copy each folder to <folder>.old before moving it (true/false)\n  \
         settle_ms           -> pause after terminating processes, in milliseconds\n  \
         log_level           -> quiet | normal | info | debug\n  \
         log_file            -> path to log file (optional; console output is kept)\n  \
         units               -> <unit name=\"...\">absolute source path</unit> entries\n\n  \
         CLI flags override XML values.\n-->\n\
         <config>\n  \
         <destination_base></destination_base>\n  \
         <destination_subdir>{DESTINATION_SUBDIR_DEFAULT}</destination_subdir>\n  \
         <process_name>{DEFAULT_PROCESS_PATTERN}</process_name>\n  \
         <make_backup>true</make_backup>\n  \
         <settle_ms>{SETTLE_MS_DEFAULT}</settle_ms>\n  \
         <log_level>normal</log_level>\n  \
         <log_file>{log}</log_file>\n  \
         <units>\n{units}  </units>\n\
         </config>\n",
        log = escape(suggested_log.as_str()),
    )
}

/// Create the template config file and its parent directory (best-effort permissions).
/// Refuses to write through a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }
    if fs::symlink_metadata(path).is_ok() {
        bail!("Refusing to overwrite existing config at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error_with_help("create config directory", parent))?;
        let _ = set_dir_mode_0700(parent);
    }

    write_config_secure_new_0600(path, render_template().as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;
    let _ = set_file_mode_0600(path);

    info!(path = %path.display(), "created template config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, xml: &str) -> PathBuf {
        let p = dir.join("config.xml");
        fs::write(&p, xml).unwrap();
        p
    }

    #[test]
    fn template_round_trips_through_loader() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("sub/config.xml");
        create_template_config(&p).unwrap();

        let cfg = load_config_from_xml_path(&p).unwrap();

        assert_eq!(cfg.destination_subdir, DESTINATION_SUBDIR_DEFAULT);
        assert_eq!(cfg.process_name, DEFAULT_PROCESS_PATTERN);
        assert!(cfg.make_backup);
        assert_eq!(cfg.units, default_units());
        assert!(cfg.destination_base.is_none());
    }

    #[test]
    fn template_is_not_overwritten() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "<config/>");
        assert!(create_template_config(&p).is_err());
        assert_eq!(fs::read_to_string(&p).unwrap(), "<config/>");
    }

    #[test]
    fn units_and_fields_are_read_and_trimmed() {
        let td = tempfile::tempdir().unwrap();
        let p = write(
            td.path(),
            r#"<config>
  <destination_base>  /mnt/big  </destination_base>
  <process_name>ZaloX</process_name>
  <make_backup> no </make_backup>
  <settle_ms>0</settle_ms>
  <log_level> debug </log_level>
  <units>
    <unit name="First">/data/first</unit>
    <unit name="Second">
      /data/second
    </unit>
  </units>
</config>"#,
        );

        let cfg = load_config_from_xml_path(&p).unwrap();

        assert_eq!(cfg.destination_base, Some(PathBuf::from("/mnt/big")));
        assert_eq!(cfg.process_name, "ZaloX");
        assert!(!cfg.make_backup);
        assert_eq!(cfg.settle_after_kill, Duration::ZERO);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(
            cfg.units,
            vec![
                RelocationUnit::new("First", "/data/first"),
                RelocationUnit::new("Second", "/data/second"),
            ]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "<config><download_base>/x</download_base></config>");
        assert!(load_config_from_xml_path(&p).is_err());
    }

    #[test]
    fn bad_values_are_errors() {
        let td = tempfile::tempdir().unwrap();
        for xml in [
            "<config><make_backup>maybe</make_backup></config>",
            "<config><settle_ms>soon</settle_ms></config>",
            "<config><log_level>loud</log_level></config>",
        ] {
            let p = write(td.path(), xml);
            assert!(load_config_from_xml_path(&p).is_err(), "{xml} accepted");
        }
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let td = tempfile::tempdir().unwrap();
        let missing = td.path().join("nope.xml");
        assert!(load_config(Some(missing.as_path())).is_err());
        assert!(!missing.exists());
    }
}
