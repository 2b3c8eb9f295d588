//! CLI integration tests, in the style of the teacher's
//! `tests/cli_integration_tests.rs` (`assert_cmd` + `predicates`).

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_cli_no_arguments() {
    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Resolve an openHAB-style YAML"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_json_output() {
    let dir = tempdir().unwrap();
    let file = write_file(
        &dir,
        "demo.yml",
        "variables:\n  room: Kitchen\nlabel: !sub \"${room} Light\"\n",
    );

    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(&file).arg("--format").arg("json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"Kitchen Light\""));
}

#[test]
fn test_cli_check_mode_reports_ok() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "demo.yml", "key: value\n");

    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(&file).arg("--check");
    cmd.assert().success().stdout(predicate::str::contains("OK"));
}

#[test]
fn test_cli_check_mode_reports_warnings() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "demo.yml", "key: !sub \"${missing}\"\n");

    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(&file).arg("--check");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("warning"));
}

#[test]
fn test_cli_missing_file_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(dir.path().join("nope.yml"));
    cmd.assert().failure();
}

#[test]
fn test_cli_load_into_openhab_false_skips() {
    let dir = tempdir().unwrap();
    let file = write_file(
        &dir,
        "demo.yml",
        "preprocessor:\n  load_into_openhab: false\nkey: value\n",
    );

    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(&file);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("processing skipped"));
}

#[test]
fn test_cli_conf_root_overrides_relative_path() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "demo.yml", "key: value\n");

    let mut cmd = Command::cargo_bin("yamlprep").unwrap();
    cmd.arg(&file).arg("--conf-root").arg(dir.path());
    cmd.assert().success();
}
