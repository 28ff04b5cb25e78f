//! CLI binary integration tests.
//!
//! These tests exercise the compiled `courier` binary to verify that
//! top-level command routing, help text, and error handling work as expected.

use std::path::PathBuf;
use std::process::Command;

/// Locate the compiled `courier` binary in the workspace target directory.
fn courier_bin() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    // tests/integration -> workspace root
    let workspace_root = manifest_dir
        .parent()
        .expect("tests/ parent")
        .parent()
        .expect("workspace root");
    let bin = workspace_root.join("target").join("debug").join("courier");
    assert!(
        bin.exists(),
        "courier binary not found at {}; run `cargo build -p courier-cli` first",
        bin.display()
    );
    bin
}

fn courier_cmd() -> Command {
    let mut cmd = Command::new(courier_bin());
    cmd.env_remove("RUST_LOG")
        .env_remove("COURIER_CONFIG")
        .env_remove("COURIER_JWT_SECRET");
    cmd
}

#[test]
fn test_cli_version() {
    let output = courier_cmd()
        .arg("version")
        .output()
        .expect("failed to run courier");
    assert!(output.status.success(), "version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("courier"),
        "version output should contain 'courier', got: {}",
        stdout
    );
}

#[test]
fn test_cli_help() {
    let output = courier_cmd()
        .arg("--help")
        .output()
        .expect("failed to run courier");
    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["gateway", "config", "token"] {
        assert!(
            stdout.contains(command),
            "help output should mention '{}', got: {}",
            command,
            stdout
        );
    }
}

#[test]
fn test_cli_unknown_command() {
    let output = courier_cmd()
        .arg("nonexistent-command")
        .output()
        .expect("failed to run courier");
    assert!(
        !output.status.success(),
        "unknown command should return non-zero exit code"
    );
}

#[test]
fn test_cli_config_init_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.json5");

    let output = courier_cmd()
        .args(["--config", path.to_str().unwrap(), "config", "init"])
        .output()
        .expect("failed to run courier config init");
    assert!(output.status.success(), "config init should succeed");
    assert!(path.exists());

    let output = courier_cmd()
        .args(["--config", path.to_str().unwrap(), "config", "get", "gateway.port"])
        .output()
        .expect("failed to run courier config get");
    assert!(output.status.success(), "config get should succeed");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "4100");
}

#[test]
fn test_cli_token_issue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.json5");
    std::fs::write(&path, r#"{ auth: { jwt_secret: "cli-secret" } }"#).unwrap();

    let output = courier_cmd()
        .args([
            "--config",
            path.to_str().unwrap(),
            "token",
            "issue",
            "--user",
            "u1",
            "--role",
            "shop",
        ])
        .output()
        .expect("failed to run courier token issue");
    assert!(output.status.success(), "token issue should succeed");
    let token = String::from_utf8_lossy(&output.stdout);
    assert_eq!(token.trim().split('.').count(), 3, "expected a JWT, got: {}", token);
}

#[test]
fn test_cli_token_issue_without_secret_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.json5");
    std::fs::write(&path, "{}").unwrap();

    let output = courier_cmd()
        .args([
            "--config",
            path.to_str().unwrap(),
            "token",
            "issue",
            "--user",
            "u1",
            "--role",
            "user",
        ])
        .output()
        .expect("failed to run courier token issue");
    assert!(!output.status.success());
}
