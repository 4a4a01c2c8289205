// CLI binary tests. Each run gets its own home directory and archive so no
// user configuration or network access is involved.

use std::path::Path;
use std::process::{Command, Output};

use chrono::Utc;
use logwatch_core::{LogEntry, LogStore};
use tempfile::TempDir;

fn run(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logwatch"))
        .args(args)
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("LOGWATCH_DATABASE_PATH", home.path().join("archive.db"))
        .env("RUST_LOG", "warn")
        .env_remove("LOGWATCH_API_KEY")
        .env_remove("RENDER_API_KEY")
        .env_remove("LOGWATCH_BASE_URL")
        .output()
        .expect("failed to run logwatch binary")
}

fn seed_archive(path: &Path) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let store = LogStore::open(path).await.unwrap();
        let entry = LogEntry::new(
            Utc::now(),
            "ERROR: keep me",
            "srv-1",
            "web",
            serde_json::Value::Null,
        );
        store.store(&[entry]).await.unwrap();
        store.pool().close().await;
    });
}

fn archived_rows(path: &Path) -> i64 {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let store = LogStore::open(path).await.unwrap();
        let count = store.count().await.unwrap();
        store.pool().close().await;
        count
    })
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = run(&home, &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["services", "logs", "analyze", "watch", "history", "purge"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_purge_on_empty_archive() {
    let home = tempfile::tempdir().unwrap();
    let output = run(&home, &["purge", "--hours", "1"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Purged 0 entries older than 1 hours"
    );
    assert!(home.path().join("archive.db").exists());
}

#[test]
fn test_history_json_on_empty_archive() {
    let home = tempfile::tempdir().unwrap();
    let output = run(&home, &["history", "--json"]);
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn test_remote_commands_need_api_key() {
    let home = tempfile::tempdir().unwrap();
    let output = run(&home, &["services"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("API key"));
}

#[test]
fn test_unknown_level_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = run(&home, &["history", "--level", "loud"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid log level"));
}

#[test]
fn test_bad_horizons_are_rejected_without_touching_archive() {
    let home = tempfile::tempdir().unwrap();
    let archive = home.path().join("archive.db");
    seed_archive(&archive);

    let cases: [&[&str]; 4] = [
        &["purge", "--hours=-1"],
        &["purge", "--hours", "0"],
        &["history", "--hours", "99999999999999"],
        &["logs", "srv-1", "--hours", "0"],
    ];
    for args in cases {
        let output = run(&home, args);
        assert!(!output.status.success(), "accepted {:?}", args);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!stderr.contains("panicked"), "{:?} panicked: {}", args, stderr);
    }

    assert_eq!(archived_rows(&archive), 1);
}

#[test]
fn test_zero_retention_in_config_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let archive = home.path().join("archive.db");
    seed_archive(&archive);

    let config_dir = home.path().join(".logwatch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[store]\nretention_hours = 0\n").unwrap();

    let output = run(&home, &["purge"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("retention_hours"), "{}", stderr);
    assert!(!stderr.contains("panicked"));

    assert_eq!(archived_rows(&archive), 1);
}
