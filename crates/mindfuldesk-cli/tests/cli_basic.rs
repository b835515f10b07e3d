//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own HOME so config, database
//! and cache never leak between tests.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_mindfuldesk"))
        .args(args)
        .env("HOME", home)
        .env_remove("MINDFULDESK_ENV")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "runtime.tick_interval_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1000");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "logging.level", "debug"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "logging.level"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "debug");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("storage.database_file = mindfuldesk.db"));
    assert!(stdout.contains("notifications.enabled = true"));
}

#[test]
fn test_blocker_popular() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["blocker", "popular"]);
    assert_eq!(code, 0);
    let sites = json(&stdout);
    assert!(sites.as_array().is_some_and(|s| !s.is_empty()));
}

#[test]
fn test_blocker_add_enable_check() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["blocker", "add", "YouTube", "youtube.com"]);
    assert_eq!(code, 0);

    // Disabled blocker allows everything.
    let (_, stdout, _) = run_cli(home.path(), &["blocker", "check", "https://youtube.com/watch"]);
    assert_eq!(stdout.trim(), "allowed");

    let (code, stdout, _) = run_cli(home.path(), &["blocker", "enable"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["enabled"], true);

    let (_, stdout, _) = run_cli(home.path(), &["blocker", "check", "https://youtube.com/watch"]);
    assert_eq!(stdout.trim(), "blocked");
    let (_, stdout, _) = run_cli(home.path(), &["blocker", "check", "https://docs.rs"]);
    assert_eq!(stdout.trim(), "allowed");
}

#[test]
fn test_blocker_override_policy_keeps_timeout() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) =
        run_cli(home.path(), &["blocker", "override", "true", "--timeout", "200"]);
    assert_eq!(code, 0);
    let settings = json(&stdout);
    assert_eq!(settings["allow_override"], true);
    assert_eq!(settings["override_timeout"], 200);

    let (code, stdout, _) = run_cli(home.path(), &["blocker", "override", "false"]);
    assert_eq!(code, 0);
    let settings = json(&stdout);
    assert_eq!(settings["allow_override"], false);
    assert_eq!(settings["override_timeout"], 200);

    let (code, _, _) = run_cli(home.path(), &["blocker", "override", "--timeout", "60"]);
    assert_ne!(code, 0);
}

#[test]
fn test_blocker_add_empty_pattern_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["blocker", "add", "Nothing", " "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_reminder_list_is_stable() {
    let home = tempfile::tempdir().unwrap();
    let (code, first, _) = run_cli(home.path(), &["reminder", "list"]);
    assert_eq!(code, 0);
    let (_, second, _) = run_cli(home.path(), &["reminder", "list"]);

    let first = json(&first);
    let second = json(&second);
    let ids = |v: &serde_json::Value| -> Vec<String> {
        v["reminders"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(ids(&first).len(), 4);
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn test_reminder_add_and_delete_custom() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["reminder", "add", "45", "Water the plants"]);
    assert_eq!(code, 0);
    let reminders = json(&stdout)["reminders"].as_array().unwrap().clone();
    let custom = reminders
        .iter()
        .find(|r| r["message"] == "Water the plants")
        .unwrap();
    let id = custom["id"].as_str().unwrap();

    let (code, stdout, _) = run_cli(home.path(), &["reminder", "delete", id]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["reminders"].as_array().unwrap().len(), 4);
}

#[test]
fn test_focus_set_rejects_zero() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["focus", "set", "--work", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_focus_set_persists() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["focus", "set", "--work", "50", "--sound", "false"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(home.path(), &["focus", "show"]);
    assert_eq!(code, 0);
    let settings = json(&stdout);
    assert_eq!(settings["work_duration"], 50);
    assert_eq!(settings["sound_enabled"], false);
}

#[test]
fn test_stats_today_empty() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["stats", "today"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["total_sessions"], 0);
}
