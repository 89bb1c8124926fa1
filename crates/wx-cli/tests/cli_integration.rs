//! CLI integration tests
//!
//! Runs the wsexec binary with assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

fn wsexec() -> Command {
    Command::cargo_bin("wsexec").expect("wsexec binary should be built for integration tests")
}

#[test]
fn test_cli_help() {
    wsexec()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("wsexec"))
        .stdout(predicate::str::contains("websocket"));
}

#[test]
fn test_cli_version() {
    wsexec()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wsexec"));
}

#[test]
fn test_cli_serve_help() {
    wsexec()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--debug-input"));
}

#[test]
fn test_cli_connect_help() {
    wsexec()
        .args(["connect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("URL"));
}

#[test]
fn test_connect_without_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[client]\n").unwrap();

    wsexec()
        .args(["--config", config.to_str().unwrap(), "connect"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No server URL"));
}

#[test]
fn test_config_show_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[serve]\nbind = \"0.0.0.0:9999\"\n\n[serve.adapter]\nping_interval = 30\n",
    )
    .unwrap();

    wsexec()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bind = \"0.0.0.0:9999\""))
        .stdout(predicate::str::contains("ping_interval = 30"))
        .stdout(predicate::str::contains("ping_timeout = 5"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("wsexec").join("config.toml");

    wsexec()
        .args(["--config", config.to_str().unwrap(), "config", "init"])
        .assert()
        .success();

    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("[serve]"));
    assert!(content.contains("ping_interval = 10"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");

    wsexec()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
