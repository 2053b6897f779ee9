use assert_fs::prelude::*;
use std::fs;
use zalo_move::{
    BatchEvent, BatchRunner, Outcome, RelocationRequest, RelocationUnit, inspect, list_backups,
    platform, purge,
};

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

// An empty process pattern matches nothing, so no real process is ever killed here.
fn runner(units: Vec<RelocationUnit>) -> BatchRunner {
    BatchRunner::new(units, "")
}

#[test]
fn two_units_move_redirect_and_back_up() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("local/ZaloPC/db/messages.db").write_binary(&[7; 4096]).unwrap();
    td.child("local/ZaloPC/settings.json").write_str("{\"lang\":\"vi\"}").unwrap();
    td.child("roaming/ZaloData/avatars/me.png").write_binary(&[3; 1024]).unwrap();
    let units = vec![
        RelocationUnit::new("ZaloPC", td.path().join("local/ZaloPC")),
        RelocationUnit::new("ZaloData", td.path().join("roaming/ZaloData")),
    ];
    let dest = td.path().join("E/zalo_move");
    let mut events = 0;

    let summary = runner(units.clone())
        .run_batch(&RelocationRequest::new(&dest, names(&["ZaloPC", "ZaloData"])), |ev| {
            if matches!(ev, BatchEvent::UnitFinished { .. }) {
                events += 1;
            }
        })
        .unwrap();

    assert_eq!(events, 2);
    assert_eq!(summary.outcomes(), vec![Outcome::Moved, Outcome::Moved]);
    assert!(!summary.has_failures());
    for u in &units {
        let status = inspect(u);
        assert!(status.exists && status.is_redirect, "{} not redirected", u.name);
        assert!(platform::is_redirect(&u.source));
        assert!(dest.join(&u.name).is_dir());
    }
    // Reads through the old path land in the moved tree.
    assert_eq!(
        fs::read_to_string(units[0].source.join("settings.json")).unwrap(),
        "{\"lang\":\"vi\"}"
    );
    assert_eq!(fs::read(dest.join("ZaloData/avatars/me.png")).unwrap(), vec![3; 1024]);

    let backups = list_backups(&units);
    assert_eq!(backups.len(), 2);
    assert_eq!(
        fs::read(td.path().join("local/ZaloPC.old/db/messages.db")).unwrap(),
        vec![7; 4096]
    );
}

#[test]
fn middle_unit_deleted_mid_run_fails_alone() {
    let td = assert_fs::TempDir::new().unwrap();
    let units: Vec<_> = ["One", "Two", "Three"]
        .iter()
        .map(|n| {
            td.child(format!("src/{n}/file.txt")).write_str(n).unwrap();
            RelocationUnit::new(*n, td.path().join("src").join(n))
        })
        .collect();
    let two = units[1].source.clone();
    let mut req = RelocationRequest::new(td.path().join("dest"), names(&["One", "Two", "Three"]));
    req.policy.make_backup = false;

    let summary = runner(units)
        .run_batch(&req, |ev| {
            if let BatchEvent::UnitFinished { index: 1, .. } = ev {
                fs::remove_dir_all(&two).unwrap();
            }
        })
        .unwrap();

    assert_eq!(summary.outcomes(), vec![Outcome::Moved, Outcome::Failed, Outcome::Moved]);
    assert_eq!((summary.moved, summary.skipped, summary.failed), (2, 0, 1));
    assert_eq!(fs::read_to_string(td.path().join("src/Three/file.txt")).unwrap(), "Three");
}

#[test]
fn second_run_skips_everything_and_purge_keeps_data() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("src/Zalo/app.bin").write_binary(&[1; 10]).unwrap();
    let units = vec![RelocationUnit::new("Zalo", td.path().join("src/Zalo"))];
    let req = RelocationRequest::new(td.path().join("dest"), names(&["Zalo"]));
    let mut r = runner(units.clone());

    assert_eq!(r.run_batch(&req, |_| {}).unwrap().moved, 1);
    let again = r.run_batch(&req, |_| {}).unwrap();
    assert_eq!(again.outcomes(), vec![Outcome::Skipped]);

    let report = purge(&list_backups(&units));
    assert_eq!(report.deleted, vec![td.path().join("src/Zalo.old")]);
    assert!(list_backups(&units).is_empty());
    assert_eq!(fs::read(units[0].source.join("app.bin")).unwrap(), vec![1; 10]);
}
