use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn grows_by_gap_plus_record(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("extendo")
        .arg(&filename)
        .args(["16", "1", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seek to end at offset 0")
            .and(predicate::str::contains(
                "write succeeded at offset 16384...  sleeping 1 ms...")));
    let len = std::fs::metadata(&filename).unwrap().len();
    assert_eq!(len, 4 * (16 * 1024 + 10));
}
