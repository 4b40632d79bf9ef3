// vim: tw=80
use std::{
    fs::OpenOptions,
    io::Write,
    os::unix::fs::OpenOptionsExt,
    time::Duration,
};

use o2torture_core::{
    fileops,
    racer::{race, Racer, Stop},
    Error,
    SysContext,
};
use pretty_assertions::assert_eq;

use super::scratch;

/// Appenders sharing a file never tear each other's writes
#[test_log::test]
fn appenders() {
    let (path, _tempdir) = scratch("test_racer_appenders");
    fileops::create_trunc(&path).unwrap();
    let racers = [b'x', b'y', b'z'].into_iter().map(|ch| {
        let path = &path;
        Racer::new(char::from(ch).to_string(), move |_: &Stop| {
            let mut f = OpenOptions::new()
                .append(true)
                .mode(0o644)
                .open(path)
                .op("open")?;
            for _ in 0..100 {
                f.write_all(&[ch; 64]).op("write")?;
            }
            Ok(())
        })
    }).collect();
    race(None, racers).unwrap();

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len(), 3 * 100 * 64);
    for block in data.chunks(64) {
        assert!(block.iter().all(|&b| b == block[0]));
    }
}

/// A failing racer stops a racer that would otherwise run forever
#[test_log::test]
fn failure_stops_the_rest() {
    let (path, _tempdir) = scratch("test_racer_failure");
    let f = fileops::create_trunc(&path).unwrap();
    let writer = Racer::new("writer", |stop: &Stop| {
        let mut ofs = 0;
        while !stop.is_set() {
            fileops::pwrite_all(&f, b"data", ofs % 4096)?;
            ofs += 4;
        }
        Ok(())
    });
    let failer = Racer::new("failer", |stop: &Stop| {
        stop.sleep(Duration::from_millis(50));
        // Reading past EOF comes up short
        let mut buf = [0u8; 16];
        fileops::pread_exact(&f, &mut buf, 1 << 30)
    });
    let e = race(None, vec![writer, failer]).unwrap_err();
    // A short read is a verification failure, so the racer exits with 1
    assert_eq!(e, Error::Racer{name: "failer".to_owned(), status: 1});
}

/// A failed system call's errno survives the trip out of the racer's process
#[test_log::test]
fn errno_propagates() {
    let (path, _tempdir) = scratch("test_racer_errno");
    let racer = Racer::new("opener", |_: &Stop| {
        fileops::open_ro(&path).map(drop)
    });
    let e = race(None, vec![racer]).unwrap_err();
    assert_eq!(e.exit_code(), libc::ENOENT);
}

/// The deadline stops racers that loop until told otherwise
#[test_log::test]
fn deadline() {
    let (path, _tempdir) = scratch("test_racer_deadline");
    let f = fileops::create_trunc(&path).unwrap();
    let truncator = Racer::new("truncator", |stop: &Stop| {
        while stop.sleep(Duration::from_millis(1)) {
            fileops::ftruncate(&f, 8192)?;
            fileops::ftruncate(&f, 4096)?;
        }
        Ok(())
    });
    race(Some(Duration::from_millis(100)), vec![truncator]).unwrap();
    assert_eq!(fileops::i_size(&f).unwrap(), 4096);
}
