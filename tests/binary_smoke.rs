use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_zalo_move"))
}

/// Config with two units under `base/src`, logging into `base`, matching no real process.
fn write_config(base: &Path) -> PathBuf {
    let cfg_path = base.join("config.xml");
    let xml = format!(
        r#"<config>
  <process_name>zalo-move-test-no-such-process</process_name>
  <settle_ms>0</settle_ms>
  <log_level>debug</log_level>
  <log_file>{log}</log_file>
  <units>
    <unit name="ZaloPC">{a}</unit>
    <unit name="ZaloData">{b}</unit>
  </units>
</config>"#,
        log = base.join("zalo_move.log").display(),
        a = base.join("src/ZaloPC").display(),
        b = base.join("src/ZaloData").display(),
    );
    fs::write(&cfg_path, xml).unwrap();
    cfg_path
}

#[test]
fn binary_print_config_succeeds() {
    bin().arg("--print-config").assert().success();
}

#[test]
fn status_reports_units_as_json() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = write_config(&base);
    fs::create_dir_all(base.join("src/ZaloPC")).unwrap();
    fs::write(base.join("src/ZaloPC/a.txt"), "12345").unwrap();

    let out = bin()
        .env("ZALO_MOVE_CONFIG", &cfg)
        .args(["status", "--report-json"])
        .output()
        .unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rows[0]["name"], "ZaloPC");
    assert_eq!(rows[0]["exists"], true);
    assert_eq!(rows[0]["size_bytes"], 5);
    assert_eq!(rows[1]["exists"], false);
}

#[test]
fn move_then_purge_backups() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = write_config(&base);
    fs::create_dir_all(base.join("src/ZaloPC/db")).unwrap();
    fs::write(base.join("src/ZaloPC/db/m.db"), "messages").unwrap();
    let dest = base.join("E");

    let out = bin()
        .env("ZALO_MOVE_CONFIG", &cfg)
        .args(["move", "--report-json", "--dest"])
        .arg(&dest)
        .output()
        .unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["moved"], 1);
    assert_eq!(summary["skipped"], 1, "ZaloData does not exist");
    assert_eq!(summary["results"][0]["outcome"], "Moved");
    assert!(zalo_move::platform::is_redirect(&base.join("src/ZaloPC")));
    assert_eq!(
        fs::read_to_string(dest.join("zalo_move/ZaloPC/db/m.db")).unwrap(),
        "messages"
    );
    assert!(base.join("src/ZaloPC.old/db/m.db").exists());

    bin()
        .env("ZALO_MOVE_CONFIG", &cfg)
        .args(["backups", "purge", "--yes"])
        .assert()
        .success();
    assert!(!base.join("src/ZaloPC.old").exists());
    assert_eq!(fs::read_to_string(base.join("src/ZaloPC/db/m.db")).unwrap(), "messages");
}

#[test]
fn move_without_destination_fails() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = write_config(&base);
    bin().env("ZALO_MOVE_CONFIG", &cfg).arg("move").assert().failure();
}

#[test]
fn unknown_unit_is_rejected_before_touching_anything() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = write_config(&base);
    let dest = base.join("E");

    bin()
        .env("ZALO_MOVE_CONFIG", &cfg)
        .args(["move", "--unit", "Nope", "--no-subdir", "--dest"])
        .arg(&dest)
        .assert()
        .failure();
    assert!(!dest.exists());
}

#[test]
fn missing_env_config_is_an_error() {
    let td = tempdir().unwrap();
    bin()
        .env("ZALO_MOVE_CONFIG", td.path().join("missing.xml"))
        .arg("status")
        .assert()
        .failure();
}

#[test]
fn move_onto_the_source_parent_keeps_the_data() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = write_config(&base);
    fs::create_dir_all(base.join("src/ZaloPC")).unwrap();
    fs::write(base.join("src/ZaloPC/precious.txt"), "keep me").unwrap();

    bin()
        .env("ZALO_MOVE_CONFIG", &cfg)
        .args(["move", "--unit", "ZaloPC", "--no-subdir", "--overwrite-dest", "--no-backup"])
        .arg("--dest")
        .arg(base.join("src"))
        .assert()
        .failure();

    assert_eq!(
        fs::read_to_string(base.join("src/ZaloPC/precious.txt")).unwrap(),
        "keep me"
    );
    assert!(!zalo_move::platform::is_redirect(&base.join("src/ZaloPC")));
}
