use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn usage() {
    o2torture("check_file_size_limits")
        .arg("/tmp/whatever")
        .assert()
        .failure()
        .code(2);
}

/// The verdict depends on the host file system, but the computed limit does
/// not.
#[rstest]
fn prints_config(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("check_file_size_limits")
        .args(["-b", "12", "-c", "12", "-B", "64"])
        .arg(&filename)
        .assert()
        .stdout(predicate::str::contains(
            "CONFIG: bbits: 12, cbits: 12, page size: ")
            .and(predicate::str::contains("max_off: 17592186040320")));
}

#[rstest]
fn thirty_two_bit_without_lbd(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("check_file_size_limits")
        .args(["-b", "9", "-c", "16", "-B", "32", "-L", "0"])
        .arg(&filename)
        .assert()
        .stdout(predicate::str::contains("max_off: 1099511627775"));
}

#[rstest]
fn not_ocfs2(harness: Harness) {
    let (filename, tempdir) = harness;
    let device = tempdir.path().join("device");
    std::fs::write(&device, vec![0u8; 1 << 20]).unwrap();
    o2torture("check_file_size_limits")
        .arg("-d")
        .arg(&device)
        .arg(&filename)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an OCFS2 volume"));
}
