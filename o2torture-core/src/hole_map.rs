// vim: tw=80
//! Predict a file's contents from its write log.
//!
//! The map holds non-overlapping extents, each filled with a single byte.
//! Inserting a write unit replaces exactly the bytes it covers, trimming or
//! splitting whatever extents were there before.

use std::{collections::BTreeMap, fs::File, os::unix::fs::FileExt};

use tracing::{debug, info};

use crate::{
    types::*,
    write_log::{WriteUnit, MAX_WRITE_SIZE},
};

/// A run of identical bytes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
    pub offset: u64,
    pub len:    u64,
    pub byte:   u8,
}

impl Extent {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Expected file contents, keyed by extent start
#[derive(Clone, Debug, Default)]
pub struct ExtentMap(BTreeMap<u64, (u64, u8)>);

impl ExtentMap {
    /// A file of `size` bytes that has never been written, so it reads as all
    /// zeros.
    pub fn new(size: u64) -> Self {
        let mut m = ExtentMap::default();
        if size > 0 {
            m.0.insert(0, (size, 0));
        }
        m
    }

    /// Record one unit from the log.
    pub fn insert(&mut self, wu: &WriteUnit) {
        if wu.len > 0 {
            self.insert_extent(wu.offset, u64::from(wu.len), wu.fill_byte());
        }
    }

    fn insert_extent(&mut self, start: u64, len: u64, byte: u8) {
        let end = start + len;
        // An extent starting before us may overlap our beginning
        let left = self.0.range(..start)
            .next_back()
            .map(|(&s, &(l, b))| (s, l, b))
            .filter(|&(s, l, _)| s + l > start);
        let inside = self.0.range(start..end)
            .map(|(&s, &(l, b))| (s, l, b))
            .collect::<Vec<_>>();
        for (s, l, b) in left.into_iter().chain(inside) {
            self.0.remove(&s);
            let e = s + l;
            if s < start {
                self.0.insert(s, (start - s, b));
            }
            if e > end {
                self.0.insert(end, (e - end, b));
            }
        }
        self.0.insert(start, (len, byte));
    }

    /// Every extent, in offset order
    pub fn iter(&self) -> impl Iterator<Item = Extent> + '_ {
        self.0.iter().map(|(&offset, &(len, byte))| Extent{offset, len, byte})
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One past the last byte covered by any extent
    pub fn end(&self) -> u64 {
        self.0.iter().next_back().map(|(&s, &(l, _))| s + l).unwrap_or(0)
    }

    /// Check every extent against the file's real contents.
    ///
    /// If `verbose`, print each extent as it is checked and describe the first
    /// bad byte.
    pub fn verify(&self, f: &File, verbose: bool) -> Result<()> {
        let mut buf = vec![0u8; MAX_WRITE_SIZE as usize];
        for ext in self.iter() {
            if verbose {
                println!("check chunk: {{{},\t{},\t{}}}",
                    describe(ext.byte), ext.offset, ext.len);
            }
            let mut ofs = ext.offset;
            while ofs < ext.end() {
                let count = (ext.end() - ofs).min(buf.len() as u64) as usize;
                let got = f.read_at(&mut buf[..count], ofs).op("pread")?;
                if got == 0 {
                    return Err(Error::check(format_args!(
                        "premature end of file at offset {ofs}")));
                }
                if got != count {
                    return Err(Error::ShortRead{offset: ofs, wanted: count,
                                                got});
                }
                let mut bad = buf[..count].iter()
                    .enumerate()
                    .filter(|&(_, &b)| b != ext.byte);
                if let Some((i, &found)) = bad.next() {
                    let offset = ofs + i as u64;
                    if verbose {
                        println!("Failure. {offset} bytes into the file we \
                                  expected {:#x} but got {found:#x}", ext.byte);
                    }
                    return Err(Error::Corrupt {
                        what: format!("extent {{{},\t{},\t{}}}",
                            describe(ext.byte), ext.offset, ext.len),
                        offset,
                        expected: ext.byte,
                        found,
                        count: 1 + bad.count()
                    });
                }
                ofs += count as u64;
            }
            debug!(offset = ext.offset, len = ext.len, "extent ok");
        }
        info!(extents = self.len(), "file verified");
        Ok(())
    }
}

impl<'a> Extend<&'a WriteUnit> for ExtentMap {
    fn extend<I: IntoIterator<Item = &'a WriteUnit>>(&mut self, iter: I) {
        for wu in iter {
            self.insert(wu);
        }
    }
}

fn describe(byte: u8) -> String {
    if byte == 0 {
        "\\0".to_owned()
    } else {
        char::from(byte).to_string()
    }
}

// LCOV_EXCL_STOP
