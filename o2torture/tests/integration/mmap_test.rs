use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn tail_is_zero(harness: Harness) {
    let (filename, _tempdir) = harness;
    std::fs::write(&filename, b"hello world").unwrap();
    o2torture("mmap_test")
        .arg(&filename)
        .assert()
        .success()
        .stdout(predicate::str::contains("size = 11, offset = 11")
            .and(predicate::str::contains("tail of ptr: \"hello world\"")));
}

#[rstest]
fn empty_file(harness: Harness) {
    let (filename, _tempdir) = harness;
    std::fs::write(&filename, b"").unwrap();
    o2torture("mmap_test")
        .arg(&filename)
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[rstest]
fn enoent(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("mmap_test")
        .arg(&filename)
        .assert()
        .failure()
        .code(libc::ENOENT);
}
