// vim: tw=80
use std::fs;

use o2torture_core::{
    fileops,
    truncate::TruncateVerifier,
    Error,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use rstest::rstest;

use super::scratch;

#[rstest]
#[case(4096, 0)]
#[case(4096, 1)]
#[case(4096, 4095)]
#[case(4096, 4096)]
#[case(4096, 12345)]
#[case(32768, 40000)]
#[case(32768, 10 * 32768)]
#[test_log::test]
fn at(#[case] cs: u64, #[case] new_size: u64) {
    let (path, _tempdir) = scratch("test_truncate_at");
    let rng = XorShiftRng::seed_from_u64(1);
    let mut v = TruncateVerifier::new(&path, cs, 10, rng);
    let plan = v.iteration_at(new_size).unwrap();
    assert_eq!(plan.new_size, new_size);
    // Each cycle cleans up after itself
    assert!(!path.exists());
}

#[test_log::test]
fn random() {
    let (path, tempdir) = scratch("test_truncate_random");
    let rng = XorShiftRng::seed_from_u64(0xdead_beef);
    let mut v = TruncateVerifier::new(&path, 4096, 20, rng);
    v.run(20).unwrap();
    // The scratch file is unlinked as soon as it is created
    assert_eq!(fs::read_dir(tempdir.path()).unwrap().count(), 0);
}

/// Garbage in the tail of the last cluster must be caught
#[test_log::test]
fn detects_stale_tail() {
    let (path, _tempdir) = scratch("test_truncate_stale_tail");
    let rng = XorShiftRng::seed_from_u64(2);
    let v = TruncateVerifier::new(&path, 4096, 4, rng);
    v.prep().unwrap();
    let plan = v.truncate_and_extend(5000).unwrap();
    let f = fileops::open_rw(&path).unwrap();
    fileops::pwrite_all(&f, b"stale", 6000).unwrap();
    let e = v.verify(&plan).unwrap_err();
    match e {
        Error::Corrupt{what, offset, expected, found, count} => {
            assert!(what.starts_with("pagecache didn't get zero'd"), "{what}");
            assert_eq!(offset, 6000);
            assert_eq!(expected, 0);
            assert_eq!(found, b's');
            assert_eq!(count, 5);
        }
        e => panic!("unexpected error {e:?}")
    }
}

#[test_log::test]
fn detects_wrong_size() {
    let (path, _tempdir) = scratch("test_truncate_wrong_size");
    let rng = XorShiftRng::seed_from_u64(3);
    let v = TruncateVerifier::new(&path, 4096, 4, rng);
    v.prep().unwrap();
    let plan = v.truncate_and_extend(100).unwrap();
    fileops::truncate_path(&path, 100).unwrap();
    let e = v.verify(&plan).unwrap_err();
    assert!(matches!(e, Error::Check(_)), "{e:?}");
}
