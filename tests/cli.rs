//! CLI surface tests for the build tool.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_distribution_flags() {
    Command::cargo_bin("studio-bundle")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sign"))
        .stdout(predicate::str::contains("--notarize"))
        .stdout(predicate::str::contains("--project-root"));
}

#[test]
fn missing_manifest_fails_as_a_metadata_stage_error() {
    let tmp = tempfile::tempdir().unwrap();
    Command::cargo_bin("studio-bundle")
        .unwrap()
        .arg("--project-root")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("metadata"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("studio-bundle")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("studio-bundle"));
}
