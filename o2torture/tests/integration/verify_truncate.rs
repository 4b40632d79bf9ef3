use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
#[case("4096")]
#[case("32768")]
fn passes(harness: Harness, #[case] cluster_size: &str) {
    let (filename, _tempdir) = harness;
    o2torture("verify_truncate")
        .arg("-f")
        .arg(&filename)
        .args(["-i", "3", "-c", "8", "-b", cluster_size])
        .assert()
        .success()
        .stdout(predicate::str::contains("Verifying")
            .and(predicate::str::contains("All tests passed.")));
}

#[rstest]
fn not_ocfs2(harness: Harness) {
    let (filename, tempdir) = harness;
    let device = tempdir.path().join("device");
    std::fs::write(&device, vec![0u8; 1 << 16]).unwrap();
    o2torture("verify_truncate")
        .arg("-f")
        .arg(&filename)
        .arg("-d")
        .arg(&device)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an OCFS2 volume"));
}
