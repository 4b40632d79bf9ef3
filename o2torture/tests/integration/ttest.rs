use std::os::unix::ffi::OsStrExt;

use assert_cmd::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn truncate_then_write(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("ttest")
        .args(["-t", "8k", "-w", "1k"])
        .arg(&filename)
        .assert()
        .success();
    let data = std::fs::read(&filename).unwrap();
    let name = filename.as_os_str().as_bytes();
    assert_eq!(data.len(), 8192);
    assert!(data[..1024].iter().all(|&b| b == 0));
    assert_eq!(&data[1024..1024 + name.len()], name);
}

#[rstest]
fn write_past_eof(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("ttest")
        .args(["-w", "1m"])
        .arg(&filename)
        .assert()
        .success();
    let len = std::fs::metadata(&filename).unwrap().len();
    assert_eq!(len, (1 << 20) + filename.as_os_str().len() as u64);
}
