use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

struct Workspace {
    dir: PathBuf,
    root: PathBuf,
    hash_db: PathBuf,
    log: PathBuf,
}

impl Workspace {
    fn new(base: &Path) -> Self {
        let root = base.join("secure_files");
        fs::create_dir_all(&root).unwrap();
        Self {
            dir: base.to_path_buf(),
            root,
            hash_db: base.join("hash_db.json"),
            log: base.join("security.log"),
        }
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("dirguard-service").unwrap();
        cmd.arg("--dir")
            .arg(&self.root)
            .arg("--hash-db")
            .arg(&self.hash_db)
            .arg("--log")
            .arg(&self.log);
        cmd
    }

    fn log_text(&self) -> String {
        fs::read_to_string(&self.log).unwrap()
    }
}

#[test]
fn first_run_creates_baseline_and_verifies() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();

    ws.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Done. Safe: 1, Corrupted: 0, Last anomaly: None",
        ));

    let db: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ws.hash_db).unwrap()).unwrap();
    assert_eq!(
        db["a.txt"]["hash"],
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(db["a.txt"]["size"], 5);

    let log = ws.log_text();
    assert!(log.contains("INFO: Baseline DB not found. Creating new baseline from current files."));
    assert!(log.contains("INFO: File a.txt added to baseline."));
    assert!(log.contains("INFO: File a.txt verified OK."));
}

#[test]
fn missing_directory_exits_with_failure() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::remove_dir(&ws.root).unwrap();

    ws.cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn modification_is_reported_and_alerted() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("report.csv"), b"id,value\n1,10\n").unwrap();
    ws.cmd().assert().success();

    fs::write(ws.root.join("report.csv"), b"id,value\n1,99\n").unwrap();
    ws.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Safe: 0, Corrupted: 1"))
        .stdout(predicate::str::contains(
            "[SIMULATED EMAIL] To: admin@example.com, Subject: [ALERT] Integrity failed: report.csv",
        ));

    assert!(ws.log_text().contains("WARNING: File report.csv integrity failed!"));

    // without --auto-update the trusted digest stays in place
    ws.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Corrupted: 1"));
}

#[test]
fn auto_update_heals_and_forgets_deleted_files() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("old.log"), b"old").unwrap();
    fs::write(ws.root.join("conf.ini"), b"a=1").unwrap();
    ws.cmd().assert().success();

    fs::remove_file(ws.root.join("old.log")).unwrap();
    fs::write(ws.root.join("conf.ini"), b"a=2").unwrap();
    ws.cmd().arg("--auto-update").assert().success();

    let db: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ws.hash_db).unwrap()).unwrap();
    assert!(db.get("old.log").is_none());

    let log = ws.log_text();
    assert!(log.contains("ALERT: File old.log deleted from monitored folder."));
    assert!(log.contains("INFO: File old.log removed from baseline (auto-update)."));
    assert!(log.contains("INFO: File conf.ini baseline updated after modification (auto-update)."));

    ws.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Done. Safe: 1, Corrupted: 0"));
}

#[test]
fn corrupt_baseline_needs_explicit_rebuild() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();
    fs::write(&ws.hash_db, "{\"a.txt\": {\"hash\": ").unwrap();

    ws.cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("corrupt"));

    ws.cmd()
        .arg("--rebuild-baseline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Done. Safe: 1, Corrupted: 0"));
    assert!(ws
        .log_text()
        .contains("WARNING: Baseline DB is corrupt. Rebuilding baseline from current files."));
}

#[test]
fn missing_smtp_config_falls_back_to_simulation() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();

    ws.cmd()
        .arg("--smtp-config")
        .arg(ws.dir.join("smtp.json"))
        .assert()
        .success();
    assert!(ws
        .log_text()
        .contains("WARNING: SMTP config file not found, email alerts will be simulated."));
}

#[test]
fn disabled_smtp_config_uses_its_recipient() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let smtp = ws.dir.join("smtp.json");
    fs::write(
        &smtp,
        r#"{"host":"smtp.example.com","port":587,"username":"u","password":"p",
            "from_addr":"fim@example.com","to_addr":"ops@example.com",
            "use_tls":true,"enabled":false}"#,
    )
    .unwrap();
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();
    ws.cmd().assert().success();
    fs::write(ws.root.join("a.txt"), b"changed").unwrap();

    ws.cmd()
        .arg("--smtp-config")
        .arg(&smtp)
        .assert()
        .success()
        .stdout(predicate::str::contains("[SIMULATED EMAIL] To: ops@example.com"));
}

#[test]
fn status_summarises_the_log() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();
    ws.cmd().assert().success();
    fs::write(ws.root.join("b.txt"), b"new").unwrap();
    ws.cmd().assert().success();

    let output = ws.cmd().arg("--status").output().unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["safe"], 2);
    assert_eq!(status["corrupted"], 1);
    assert!(status["last_anomaly"].is_string());
    assert!(status["logs"].as_array().unwrap().len() <= 20);
}

#[test]
fn blake3_algorithm_is_selectable() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();

    ws.cmd().args(["--algorithm", "blake3"]).assert().success();
    let db: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ws.hash_db).unwrap()).unwrap();
    let hash = db["a.txt"]["hash"].as_str().unwrap();
    assert_eq!(hash.len(), 64);
    assert_ne!(
        hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(db["a.txt"]["algo"], "blake3");
}

#[test]
fn changing_algorithm_keeps_unchanged_files_safe() {
    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();
    ws.cmd().assert().success();
    let sha256_db = fs::read(&ws.hash_db).unwrap();

    ws.cmd()
        .args(["--algorithm", "sha512"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Safe: 1, Corrupted: 0"))
        .stdout(predicate::str::contains("[SIMULATED EMAIL]").not());
    assert_eq!(fs::read(&ws.hash_db).unwrap(), sha256_db);

    ws.cmd()
        .args(["--algorithm", "sha512", "--auto-update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("re-hashed with the configured algorithm"));
    let db: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ws.hash_db).unwrap()).unwrap();
    assert_eq!(db["a.txt"]["algo"], "sha512");
    assert_eq!(db["a.txt"]["hash"].as_str().unwrap().len(), 128);
}

#[cfg(unix)]
#[test]
fn interrupt_during_watch_stops_cleanly() {
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    let dir = tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    fs::write(ws.root.join("a.txt"), b"hello").unwrap();

    let mut child = Command::new(assert_cmd::cargo::cargo_bin("dirguard-service"))
        .arg("--dir")
        .arg(&ws.root)
        .arg("--hash-db")
        .arg(&ws.hash_db)
        .arg("--log")
        .arg(&ws.log)
        .args(["--watch", "--interval", "60"])
        .stdout(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !fs::read_to_string(&ws.log)
        .map(|t| t.contains("Starting watcher"))
        .unwrap_or(false)
    {
        assert!(Instant::now() < deadline, "watcher never started");
        std::thread::sleep(Duration::from_millis(20));
    }

    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("watcher ignored SIGINT");
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    assert!(status.success());
    assert!(ws
        .log_text()
        .trim_end()
        .ends_with("INFO: Watcher stopped by user. Exiting."));
}
