// vim: tw=80
use std::io::Cursor;

use o2torture_core::{
    fileops,
    hole_map::ExtentMap,
    resv::{self, Method},
    write_log::{LogReader, LogWriter, WriteUnit},
    Error,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use super::scratch;

const SIZE: u64 = 1 << 20;

/// Apply random units, log them, and verify against the replayed log
#[test_log::test]
fn fill_log_verify() {
    let (path, tempdir) = scratch("test_holes_fill");
    let log_path = tempdir.path().join("log");
    let f = fileops::create_trunc(&path).unwrap();
    fileops::ftruncate(&f, SIZE).unwrap();
    let mut log = LogWriter::create(&log_path, false).unwrap();
    let mut rng = XorShiftRng::seed_from_u64(42);
    for _ in 0..500 {
        let wu = WriteUnit::random(&mut rng, SIZE);
        log.append(&wu).unwrap();
        fileops::pwrite_all(&f, &wu.data(), wu.offset).unwrap();
    }
    log.flush().unwrap();

    let mut map = ExtentMap::new(fileops::i_size(&f).unwrap());
    for wu in LogReader::open(&log_path).unwrap() {
        map.insert(&wu.unwrap());
    }
    map.verify(&f, false).unwrap();
}

#[test_log::test]
fn verify_catches_lost_write() {
    let (path, _tempdir) = scratch("test_holes_lost_write");
    let f = fileops::create_trunc(&path).unwrap();
    fileops::ftruncate(&f, 65536).unwrap();
    let wu = WriteUnit::new(b'Q', 1000, 2000);
    fileops::pwrite_all(&f, &wu.data(), wu.offset).unwrap();
    let mut map = ExtentMap::new(65536);
    map.insert(&wu);
    // Logged, but never written
    map.insert(&WriteUnit::new(b'R', 40000, 10));
    let e = map.verify(&f, false).unwrap_err();
    assert!(matches!(e,
        Error::Corrupt{offset: 40000, expected: b'R', found: 0, count: 10, ..}),
        "{e:?}");
}

#[test_log::test]
fn verify_catches_short_file() {
    let (path, _tempdir) = scratch("test_holes_short_file");
    let f = fileops::create_trunc(&path).unwrap();
    fileops::ftruncate(&f, 4096).unwrap();
    let mut map = ExtentMap::new(8192);
    map.insert(&WriteUnit::new(b'a', 0, 100));
    assert!(map.verify(&f, false).is_err());
}

/// Punched holes read back as zeros, if the file system can punch at all
#[test_log::test]
fn punch_with_fallocate() {
    let (path, _tempdir) = scratch("test_holes_punch");
    let f = fileops::create_trunc(&path).unwrap();
    let mut map = ExtentMap::new(0);
    let fill = WriteUnit::new(b'z', 0, 65536);
    fileops::pwrite_all(&f, &fill.data(), 0).unwrap();
    map.insert(&fill);
    let hole = WriteUnit::hole(8192, 16384);
    match resv::punch(&f, Method::Fallocate, hole.offset, u64::from(hole.len)) {
        Err(Error::Sys{errno: nix::errno::Errno::EOPNOTSUPP, ..}) => {
            eprintln!("File system can't punch holes.  Skipping test.");
            return;
        }
        r => r.unwrap()
    }
    map.insert(&hole);
    assert_eq!(fileops::i_size(&f).unwrap(), 65536);
    map.verify(&f, true).unwrap();
}

#[test]
fn log_round_trip_through_reader() {
    let text = "a\t0\t10\n@\t5\t2\nB\t100\t1\n";
    let units = LogReader::new(Cursor::new(text))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(units.len(), 3);
    assert!(units[1].is_hole());
    let mut map = ExtentMap::new(0);
    map.extend(units.iter());
    assert_eq!(map.end(), 101);
}
