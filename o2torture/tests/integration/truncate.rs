use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
#[case("0", 0)]
#[case("4k", 4096)]
#[case("0x100", 256)]
#[case("1m", 1 << 20)]
fn by_path(harness: Harness, #[case] size: &str, #[case] expected: u64) {
    let (filename, _tempdir) = harness;
    std::fs::write(&filename, vec![b'x'; 10000]).unwrap();
    o2torture("truncate")
        .arg(&filename)
        .arg(size)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("to {expected}")));
    assert_eq!(std::fs::metadata(&filename).unwrap().len(), expected);
}

#[rstest]
fn missing_file(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("truncate")
        .arg(&filename)
        .arg("4096")
        .assert()
        .failure()
        .code(libc::ENOENT);
}

#[rstest]
fn bad_size(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("truncate")
        .arg(&filename)
        .arg("12q")
        .assert()
        .failure()
        .code(2);
}
