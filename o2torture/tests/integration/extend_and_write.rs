use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn run_and_verify(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("extend_and_write")
        .arg("run")
        .arg("-f")
        .arg(&filename)
        .args(["-s", "512", "-n", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "file will be 204800 bytes after this run"));
    o2torture("extend_and_write")
        .arg("verify")
        .arg("-f")
        .arg(&filename)
        .args(["-s", "512", "-n", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("File verification successful."));
}

/// Verifying with too large a block count must fail
#[rstest]
fn verify_mismatch(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("extend_and_write")
        .arg("run")
        .arg("-f")
        .arg(&filename)
        .args(["-s", "512", "-n", "20"])
        .assert()
        .success();
    o2torture("extend_and_write")
        .arg("verify")
        .arg("-f")
        .arg(&filename)
        .args(["-s", "512", "-n", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "File is too small, could only read 20480 bytes"));
}
