//! Process-level smoke tests for the `acpihost` binary.

use std::path::PathBuf;

use assert_cmd::Command;

use acpihost_tables::{aml, build_table};

fn write_dsdt(dir: &tempfile::TempDir, payload: &[u8]) -> PathBuf {
    let path = dir.path().join("dsdt.aml");
    std::fs::write(&path, build_table(b"DSDT", 2, payload)).expect("failed to write DSDT fixture");
    path
}

fn dsdt_returning(data: &[u8]) -> Vec<u8> {
    aml::method("MAIN", &aml::return_value(data))
}

fn acpihost() -> Command {
    assert_cmd::cargo::cargo_bin_cmd!("acpihost")
}

#[test]
fn integer_expectation_passes() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(42)));

    acpihost()
        .arg(&dsdt)
        .args(["--expect", "int", "42"])
        .assert()
        .success();
}

#[test]
fn integer_mismatch_fails_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(42)));

    let assert = acpihost()
        .arg(&dsdt)
        .args(["--expect", "int", "43"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains("doesn't match expected '43'"),
        "stderr was: {stderr}"
    );
}

#[test]
fn string_expectation_passes_and_type_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::string("hello")));

    acpihost()
        .arg(&dsdt)
        .args(["--expect", "str", "hello"])
        .assert()
        .success();

    let assert = acpihost()
        .arg(&dsdt)
        .args(["--expect", "int", "42"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains("returned type 'String' doesn't match expected 'Integer'"),
        "stderr was: {stderr}"
    );
}

#[test]
fn emulation_mode_needs_no_expectation() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &aml::name("VAL_", &aml::integer(7)));

    acpihost().arg(&dsdt).assert().success();
}

#[test]
fn namespace_dump_is_printed_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(1)));

    let assert = acpihost().arg(&dsdt).arg("-d").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("\\MAIN [Method] (0 args)"), "stdout was: {stdout}");
}

#[test]
fn resource_tests_keyword_runs_the_battery() {
    acpihost().arg("resource-tests").assert().success();
}

#[test]
fn extra_tables_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(42)));
    let ssdt_path = dir.path().join("extra.aml");
    std::fs::write(
        &ssdt_path,
        build_table(b"SSDT", 1, &aml::name("EXTR", &aml::integer(1))),
    )
    .unwrap();

    acpihost()
        .arg(&dsdt)
        .args(["--extra-tables"])
        .arg(&ssdt_path)
        .args(["--expect", "int", "42"])
        .assert()
        .success();
}

#[test]
fn unsupported_expected_type_is_an_argument_error() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(42)));

    let assert = acpihost()
        .arg(&dsdt)
        .args(["--expect", "float", "42"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains("unsupported type for validation"),
        "stderr was: {stderr}"
    );
}

#[test]
fn short_expect_pair_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let dsdt = write_dsdt(&dir, &dsdt_returning(&aml::integer(42)));

    acpihost()
        .arg(&dsdt)
        .args(["--expect", "int"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn missing_dsdt_file_fails_cleanly() {
    acpihost()
        .arg("/nonexistent/dsdt.aml")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn help_exits_zero() {
    acpihost().arg("--help").assert().success();
}
