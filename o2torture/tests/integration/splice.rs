use std::fs;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn write_then_read(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("splice")
        .arg("write")
        .arg(&filename)
        .write_stdin("spliced through a pipe\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("spliced length = 23"));
    assert_eq!(fs::read(&filename).unwrap(), b"spliced through a pipe\n");

    o2torture("splice")
        .arg("read")
        .arg(&filename)
        .assert()
        .success()
        .stdout("spliced through a pipe\n")
        .stderr(predicate::str::contains("spliced length = 23"));
}

#[rstest]
fn read_missing(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("splice")
        .arg("read")
        .arg(&filename)
        .assert()
        .failure()
        .code(libc::ENOENT);
}
