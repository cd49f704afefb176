//! E2E tests for the pseudo-rss CLI

#![allow(deprecated)] // cargo_bin deprecation - will update when assert_cmd stabilizes replacement

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn pseudo_rss() -> Command {
    Command::cargo_bin("pseudo-rss").unwrap()
}

#[test]
fn test_help() {
    pseudo_rss()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sameDomain"))
        .stdout(predicate::str::contains("--onlyTextExists"))
        .stdout(predicate::str::contains("--newOnlyDiff"))
        .stdout(predicate::str::contains("--cache"));
}

#[test]
fn test_version() {
    pseudo_rss()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pseudo-rss"));
}

#[test]
fn test_format_values() {
    pseudo_rss()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("docx"));

    pseudo_rss()
        .args(["--format", "xml", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_no_pages() {
    pseudo_rss()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_empty_input_file() {
    let dir = tempdir().unwrap();
    let list = dir.path().join("list.csv");
    fs::write(&list, "\n\n").unwrap();

    pseudo_rss()
        .args(["--input", list.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_input_file_not_found() {
    pseudo_rss()
        .args(["--input", "nonexistent.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input"));
}
