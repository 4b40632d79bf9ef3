use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn creates_one_file_per_loop(harness: Harness) {
    let (filename, tempdir) = harness;
    o2torture("forkwriter")
        .arg(&filename)
        .args(["3", "2", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loop 2, Process 1"));
    for i in 0..3 {
        let path = tempdir.path().join(format!("testfile_{i:03}"));
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.lines().count() >= 100);
    }
    assert!(!tempdir.path().join("testfile_003").exists());
}
