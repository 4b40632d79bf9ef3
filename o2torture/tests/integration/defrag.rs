use std::{fs, path::{Path, PathBuf}};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

use super::util::*;

/// Every (file, log) pair that frager wrote, in no particular order
fn written(work: &Path, logs: &Path)
    -> Vec<(PathBuf, PathBuf)>
{
    let mut pairs = Vec::new();
    for d in fs::read_dir(work).unwrap() {
        let d = d.unwrap();
        let log_dir = logs.join(d.file_name());
        for f in fs::read_dir(d.path()).unwrap() {
            let f = f.unwrap();
            let name = f.file_name().into_string().unwrap();
            let j = name.strip_prefix("file-").unwrap();
            pairs.push((f.path(), log_dir.join(format!("logfile-{j}"))));
        }
    }
    pairs
}

fn frager(work: &Path, logs: &Path, random: bool) {
    fs::create_dir(work).unwrap();
    fs::create_dir(logs).unwrap();
    let mut cmd = o2torture("frager");
    cmd.args(["-n", "2", "-m", "3", "-l", "64k", "-k", "4096", "-w"])
        .arg(work)
        .arg("-o")
        .arg(logs);
    if random {
        cmd.arg("-r");
    }
    cmd.assert()
        .success();
}

#[rstest]
#[case::sequential(false)]
#[case::random(true)]
fn frag_then_verify(harness: Harness, #[case] random: bool) {
    let (_, tempdir) = harness;
    let work = tempdir.path().join("work");
    let logs = tempdir.path().join("logs");
    frager(&work, &logs, random);
    let pairs = written(&work, &logs);
    // One directory per writer process
    assert_eq!(fs::read_dir(&work).unwrap().count(), 3);
    assert_eq!(pairs.len(), 6);
    for (file, log) in pairs {
        assert_eq!(fs::metadata(&file).unwrap().len(), 65536);
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 16);
        o2torture("verify_file")
            .arg("-f")
            .arg(&file)
            .arg("-o")
            .arg(&log)
            .args(["-l", "64k", "-k", "4096"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Verified 16 chunks"));
    }
}

#[rstest]
fn verify_detects_corruption(harness: Harness) {
    let (_, tempdir) = harness;
    let work = tempdir.path().join("work");
    let logs = tempdir.path().join("logs");
    frager(&work, &logs, false);
    let (file, log) = written(&work, &logs).pop().unwrap();
    let mut data = fs::read(&file).unwrap();
    data[5 * 4096 + 100] ^= 0xff;
    fs::write(&file, data).unwrap();
    o2torture("verify_file")
        .arg("-f")
        .arg(&file)
        .arg("-o")
        .arg(&log)
        .args(["-l", "64k", "-k", "4096"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Inconsistent chunk 5"));
}

/// The log names a chunk beyond the file size given
#[rstest]
fn verify_filesize_too_small(harness: Harness) {
    let (_, tempdir) = harness;
    let work = tempdir.path().join("work");
    let logs = tempdir.path().join("logs");
    frager(&work, &logs, false);
    let (file, log) = written(&work, &logs).pop().unwrap();
    o2torture("verify_file")
        .arg("-f")
        .arg(&file)
        .arg("-o")
        .arg(&log)
        .args(["-l", "32k", "-k", "4096"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file size may be too small"));
}

/// Other file systems don't know OCFS2_IOC_MOVE_EXT
#[rstest]
fn defrager_not_ocfs2(harness: Harness) {
    let (filename, _tempdir) = harness;
    fs::write(&filename, vec![b'x'; 65536]).unwrap();
    o2torture("defrager")
        .args(["-s", "0", "-l", "64k"])
        .arg(&filename)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ioctl failed"));
}

#[rstest]
fn defrager_missing_file(harness: Harness) {
    let (filename, _tempdir) = harness;
    o2torture("defrager")
        .arg(&filename)
        .assert()
        .failure()
        .code(libc::ENOENT);
}
