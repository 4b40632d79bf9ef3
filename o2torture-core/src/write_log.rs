// vim: tw=80
//! The write log shared by the hole-filling programs and their verifier.
//!
//! Each line records one write unit as `<char>\t<offset>\t<len>`.  A unit whose
//! char is [`MAGIC_HOLE_CHAR`] records a punched hole rather than a write.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use rand::Rng;

use crate::{fileops, types::*};

/// Largest single write, and the verifier's read chunk size
pub const MAX_WRITE_SIZE: u32 = 32768;
/// Random fill chars start here and span [`RAND_CHAR_SPAN`] values
pub const RAND_CHAR_START: u8 = b'A';
pub const RAND_CHAR_SPAN: u8 = 52;
/// Marks a punched hole in the log
pub const MAGIC_HOLE_CHAR: u8 = RAND_CHAR_START - 1;

/// One logged write or hole
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteUnit {
    pub ch:     u8,
    pub offset: u64,
    pub len:    u32,
}

impl WriteUnit {
    pub fn new(ch: u8, offset: u64, len: u32) -> Self {
        WriteUnit{ch, offset, len}
    }

    /// A hole punched over `[offset, offset + len)`
    pub fn hole(offset: u64, len: u32) -> Self {
        WriteUnit{ch: MAGIC_HOLE_CHAR, offset, len}
    }

    /// A random write that lies entirely within a file of `file_size` bytes.
    ///
    /// # Panics
    ///
    /// If `file_size` is 0.
    pub fn random<R: Rng>(rng: &mut R, file_size: u64) -> Self {
        let ch = RAND_CHAR_START + rng.gen_range(0..RAND_CHAR_SPAN);
        let offset = rng.gen_range(0..file_size);
        let len = rng.gen_range(1..=MAX_WRITE_SIZE);
        let len = u64::from(len).min(file_size - offset) as u32;
        WriteUnit{ch, offset, len}
    }

    pub fn is_hole(&self) -> bool {
        self.ch == MAGIC_HOLE_CHAR
    }

    /// The byte this unit leaves in the file.  Holes read as zero.
    pub fn fill_byte(&self) -> u8 {
        if self.is_hole() { 0 } else { self.ch }
    }

    /// One past the last byte covered
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.len)
    }

    /// The data this unit writes
    pub fn data(&self) -> Vec<u8> {
        vec![self.ch; self.len as usize]
    }
}

impl fmt::Display for WriteUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}\t{}", char::from(self.ch), self.offset, self.len)
    }
}

impl FromStr for WriteUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut fields = s.split('\t');
        let ch = match fields.next().map(str::as_bytes) {
            Some([c]) => *c,
            _ => return Err("expected a single fill character".to_owned())
        };
        let offset = fields.next()
            .ok_or("missing offset")?
            .parse::<u64>()
            .map_err(|e| format!("bad offset: {e}"))?;
        let len = fields.next()
            .ok_or("missing length")?
            .parse::<u32>()
            .map_err(|e| format!("bad length: {e}"))?;
        if fields.next().is_some() {
            return Err("trailing fields".to_owned());
        }
        if offset.checked_add(u64::from(len)).is_none() {
            return Err(format!("unit at {offset} with length {len} runs past \
                                the largest possible file"));
        }
        Ok(WriteUnit{ch, offset, len})
    }
}

/// Iterates over the write units in a log
pub struct LogReader<R> {
    inner: R,
    line:  usize,
}

impl<R: BufRead> LogReader<R> {
    pub fn new(inner: R) -> Self {
        LogReader{inner, line: 0}
    }
}

impl LogReader<io::BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let f = fileops::open_ro(path)?;
        Ok(Self::new(io::BufReader::new(f)))
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<WriteUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut s = String::new();
        match self.inner.read_line(&mut s) {
            Ok(0) => return None,
            Ok(_) => (),
            Err(e) => return Some(Err(e.into()))
        }
        self.line += 1;
        let line = self.line;
        let s = s.strip_suffix('\n').unwrap_or(&s);
        Some(s.parse::<WriteUnit>().map_err(|reason| Error::Log{line, reason}))
    }
}

enum Sink {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

/// Appends records to a log, one per line
pub struct LogWriter {
    sink: Sink,
    sync: bool,
}

impl LogWriter {
    /// Log to stdout.  If `sync`, flush after every unit.
    pub fn stdout(sync: bool) -> Self {
        LogWriter{sink: Sink::Stdout(io::stdout()), sync}
    }

    /// Log to a newly created file.  If `sync`, flush and fsync after every
    /// unit.
    pub fn create(path: &Path, sync: bool) -> Result<Self> {
        let f = fileops::create_trunc(path)?;
        Ok(LogWriter{sink: Sink::File(BufWriter::new(f)), sync})
    }

    /// Append one record, which is usually a [`WriteUnit`]
    pub fn append<D: fmt::Display>(&mut self, wu: &D) -> Result<()> {
        match &mut self.sink {
            Sink::Stdout(s) => {
                let mut s = s.lock();
                writeln!(s, "{wu}").op("write")?;
                if self.sync {
                    s.flush().op("write")?;
                }
            }
            Sink::File(w) => {
                writeln!(w, "{wu}").op("write")?;
                if self.sync {
                    w.flush().op("write")?;
                    fileops::fsync(w.get_ref())?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        match &mut self.sink {
            Sink::Stdout(s) => s.flush().op("write"),
            Sink::File(w) => w.flush().op("write"),
        }
    }
}

// LCOV_EXCL_STOP
