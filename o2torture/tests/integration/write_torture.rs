use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn races(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("write_torture")
        .args(["-s", &scaled(2)])
        .arg(&filename)
        .assert()
        .success()
        .stdout(predicate::str::contains("[append]: append write len\t: ")
            .and(predicate::str::contains("[straddle]: ")));
}

#[rstest]
fn bad_dir(harness: Harness) {
    let (_filename, tempdir) = harness;
    o2torture("write_torture")
        .args(["-s", "1"])
        .arg(tempdir.path().join("nonexistent/testfile"))
        .assert()
        .failure()
        .code(libc::ENOENT);
}
