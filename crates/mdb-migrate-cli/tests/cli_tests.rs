//! CLI integration tests for mdb-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for errors caught before any database work.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mdb-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("mdb-migrate").unwrap()
}

// =============================================================================
// Help, Version and Listing Tests
// =============================================================================

#[test]
fn test_help_shows_all_options() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--transaction"))
        .stdout(predicate::str::contains("--text-encoding"))
        .stdout(predicate::str::contains("--blob-encoding"))
        .stdout(predicate::str::contains("--encodings"))
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--log-query"))
        .stdout(predicate::str::contains("--mdbtools-dir"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mdb-migrate"));
}

#[test]
fn test_encodings_lists_catalogue() {
    cmd()
        .arg("--encodings")
        .assert()
        .success()
        .stdout(predicate::str::contains("windows-1252"))
        .stdout(predicate::str::contains("UTF-16LE"));
}

#[test]
fn test_encodings_needs_no_destination() {
    cmd()
        .args(["--encodings", "--verbosity", "debug"])
        .assert()
        .code(0);
}

// =============================================================================
// Argument Error Tests
// =============================================================================

#[test]
fn test_no_arguments_fails() {
    cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "destination uri and at least one source file are required",
        ));
}

#[test]
fn test_destination_without_files_fails() {
    cmd().arg("sqlite3:///tmp/out.db").assert().code(1);
}

#[test]
fn test_unsupported_scheme_fails() {
    cmd()
        .args(["mssql://localhost/db", "legacy.mdb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a supported database backend"));
}

#[test]
fn test_unknown_transaction_mode_fails() {
    cmd()
        .args(["--transaction", "row", "sqlite3:///tmp/out.db", "legacy.mdb"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown transaction mode"));
}

#[test]
fn test_unknown_encoding_fails() {
    cmd()
        .args([
            "--text-encoding",
            "klingon",
            "sqlite3:///tmp/out.db",
            "legacy.mdb",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("encoding \"klingon\" does not exist"));
}

#[test]
fn test_unknown_flag_exits_one() {
    cmd().arg("--no-such-flag").assert().code(1);
}

#[test]
fn test_invalid_log_format() {
    cmd()
        .args(["--log-format", "xml", "--encodings"])
        .assert()
        .code(1);
}

// =============================================================================
// Config File Tests
// =============================================================================

#[test]
fn test_missing_config_file() {
    cmd()
        .args(["--config", "/nonexistent/mdb-migrate.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_invalid_yaml_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "destination: [unterminated").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("YAML error"));
}

#[test]
fn test_config_values_are_validated() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "destination: oracle://localhost/db").unwrap();
    writeln!(file, "files: [legacy.mdb]").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a supported database backend"));
}

#[test]
fn test_command_line_overrides_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "destination: oracle://localhost/db").unwrap();
    writeln!(file, "files: [legacy.mdb]").unwrap();
    writeln!(file, "blob_encoding: windows-1252").unwrap();

    // The CLI destination replaces the unsupported one; the encoding override fails instead
    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "--blob-encoding",
            "nope",
            "sqlite3:///tmp/out.db",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("encoding \"nope\" does not exist"));
}

// =============================================================================
// Source Tool Tests
// =============================================================================

#[test]
fn test_mdbtools_dir_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("legacy.mdb");
    std::fs::write(&source, b"not really an access file").unwrap();
    let destination = format!("sqlite3://{}", dir.path().join("out.db").display());
    let tools = dir.path().join("no-tools-here");

    cmd()
        .args([
            "--mdbtools-dir",
            tools.to_str().unwrap(),
            destination.as_str(),
            source.to_str().unwrap(),
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("running mdb-tables"));
}
