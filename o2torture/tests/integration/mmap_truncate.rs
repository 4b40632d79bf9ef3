use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn runs_clean(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("mmap_truncate")
        .args(["-c", "12", "-s", &scaled(1)])
        .arg(&filename)
        .assert()
        .success()
        .stdout(predicate::str::contains("All tests passed.")
            .and(predicate::str::is_match("Caught [0-9]+ SIGBUS").unwrap()));
    assert_eq!(std::fs::metadata(&filename).unwrap().len(), 8192);
}
