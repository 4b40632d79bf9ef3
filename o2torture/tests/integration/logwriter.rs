use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn echoes_and_appends(harness: Harness) {
    let (filename, _tempdir) = harness;
    let out = o2torture("logwriter")
        .arg(&filename)
        .args(["0", "5"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("write 5 times to file "))
        .get_output()
        .stdout
        .clone();
    let logged = std::fs::read_to_string(&filename).unwrap();
    assert_eq!(logged.lines().count(), 5);
    // Everything written to the log is echoed
    assert!(String::from_utf8(out).unwrap().ends_with(&logged));
}
