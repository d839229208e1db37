use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn write_config(dir: &TempDir, config: &str, cloud_config: &str) -> PathBuf {
    fs::write(dir.path().join("cloud.yaml"), cloud_config).unwrap();
    let path = dir.path().join("metalstrap.toml");
    fs::write(&path, config).unwrap();
    path
}

fn metalstrap(args: &[&str], config: &Path) -> std::process::Output {
    Command::cargo_bin("metalstrap")
        .unwrap()
        .args(args)
        .arg("--config")
        .arg(config)
        .env_remove("ROBOT_USER")
        .env_remove("ROBOT_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run metalstrap")
}

const TWO_TARGETS: &str = r#"
[[targets]]
ip = "10.0.0.1"
hostname = "node-1"
cloud_config = "cloud.yaml"

[[targets]]
ip = "10.0.0.2"
hostname = "node-2"
cloud_config = "cloud.yaml"
manager = true
"#;

#[test]
fn test_help_lists_commands() {
    let output = Command::cargo_bin("metalstrap")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: metalstrap"), "Missing usage text");
    assert!(stdout.contains("bootstrap"), "Missing bootstrap command");
    assert!(stdout.contains("check"), "Missing check command");
}

#[test]
fn test_check_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, TWO_TARGETS, "hostname: {{ hostname }}\n");

    let output = metalstrap(&["check", "--cluster"], &config);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "check failed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("manager: 10.0.0.2 (node-2), workers: 1"));
    assert!(stdout.contains("configuration OK: 2 targets"));
}

#[test]
fn test_check_rejects_two_managers() {
    let dir = tempfile::tempdir().unwrap();
    let text = TWO_TARGETS.replacen("cloud_config = \"cloud.yaml\"\n", "cloud_config = \"cloud.yaml\"\nmanager = true\n", 1);
    let config = write_config(&dir, &text, "hostname: {{ hostname }}\n");

    let output = metalstrap(&["check", "--cluster"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("more than one target is flagged as manager"), "{stderr}");
}

#[test]
fn test_check_rejects_unknown_action() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!("{TWO_TARGETS}actions = [\"reset\", \"format_everything\"]\n");
    let config = write_config(&dir, &text, "hostname: {{ hostname }}\n");

    let output = metalstrap(&["check"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("format_everything"), "{stderr}");
}

#[test]
fn test_check_rejects_broken_template() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, TWO_TARGETS, "hostname: {{ hostname\n");

    let output = metalstrap(&["check"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cloud config"), "{stderr}");
}

#[test]
fn test_bootstrap_requires_robot_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, TWO_TARGETS, "hostname: {{ hostname }}\n");

    let output = metalstrap(&["bootstrap"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no Robot user given"), "{stderr}");
}
