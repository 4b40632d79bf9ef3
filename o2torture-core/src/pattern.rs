// vim: tw=80
//! The verification pattern
//!
//! A pattern is one cluster's worth of bytes.  Programs write it at known
//! offsets, possibly invalidate part of it with a truncate, and later compare
//! it against what the file really holds.

use std::ops::Deref;

use rand::Rng;

use crate::{types::*, util::rand_upper};

/// The first difference between a pattern and the bytes read back
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Mismatch {
    /// Offset of the first bad byte, relative to the compared buffer
    pub offset:   usize,
    pub expected: u8,
    pub found:    u8,
    /// Total number of bad bytes in the compared buffer
    pub count:    usize,
}

impl Mismatch {
    /// Convert into an `Error`, relocating the offset to an absolute file
    /// offset.
    pub fn into_error<S: Into<String>>(self, what: S, base: u64) -> Error {
        Error::Corrupt {
            what: what.into(),
            offset: base + self.offset as u64,
            expected: self.expected,
            found: self.found,
            count: self.count
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern(Vec<u8>);

impl Pattern {
    /// A pattern of random uppercase letters
    pub fn random<R: Rng>(rng: &mut R, len: usize) -> Self {
        Pattern((0..len).map(|_| rand_upper(rng)).collect())
    }

    /// A pattern that repeats a single byte
    pub fn filled(byte: u8, len: usize) -> Self {
        Pattern(vec![byte; len])
    }

    /// What the last cluster of a file should contain after the file was
    /// truncated to `new_size` and then extended back out to a cluster
    /// boundary.
    ///
    /// Everything from `new_size` to the end of its cluster reads as zero.  If
    /// `new_size` is cluster-aligned, the last cluster is untouched.
    pub fn truncated(&self, new_size: u64) -> Pattern {
        let keep = (new_size % self.0.len() as u64) as usize;
        let mut v = self.0.clone();
        if keep != 0 {
            v[keep..].fill(0);
        }
        Pattern(v)
    }

    /// Compare against `found`.
    ///
    /// Returns `None` when they're identical.  Bytes that only one side has
    /// count as bad, and read as zero on the side that lacks them.
    pub fn compare(&self, found: &[u8]) -> Option<Mismatch> {
        let common = self.0.len().min(found.len());
        let extra = self.0.len().abs_diff(found.len());
        let mut bad = (0..common).filter(|&i| self.0[i] != found[i]);
        let (offset, count) = match bad.next() {
            Some(i) => (i, 1 + bad.count() + extra),
            None if extra > 0 => (common, extra),
            None => return None
        };
        Some(Mismatch {
            offset,
            expected: self.0.get(offset).copied().unwrap_or(0),
            found: found.get(offset).copied().unwrap_or(0),
            count
        })
    }
}

impl Deref for Pattern {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

// LCOV_EXCL_STOP
