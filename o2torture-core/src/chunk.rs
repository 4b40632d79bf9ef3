// vim: tw=80
//! Self-describing chunks, for files whose data gets moved around underneath
//! them.
//!
//! Every chunk carries its own number, a write timestamp, and a checksum of
//! its fill, both at its head and mirrored at its tail:
//!
//! ```text
//! chunk_no | timestamp | checksum | fill ... | checksum | timestamp | chunk_no
//! ```
//!
//! Numbers are little-endian.  The writer logs each chunk as
//! `<chunk_no>\t<timestamp>\t<checksum>\t<char>`, and the verifier checks the
//! file against the latest log record for every chunk.  A chunk with no record
//! must either be a hole or be internally consistent.

use std::{
    fmt,
    fs::File,
    io::BufRead,
    os::unix::fs::FileExt,
    path::Path,
    str::FromStr,
};

use byteorder::{ByteOrder, LittleEndian};
use rand::{seq::SliceRandom, Rng};
use time::OffsetDateTime;
use tracing::debug;

use crate::{fileops, types::*, util::div_roundup, write_log::LogWriter};

/// Bytes taken by the head, and again by the tail
pub const HEADER_LEN: usize = 20;
/// Smallest chunk that has room for at least one byte of fill
pub const MIN_CHUNK_SIZE: u32 = 2 * HEADER_LEN as u32 + 1;

/// One written chunk
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Chunk {
    pub chunk_no:  u64,
    /// Microseconds since the epoch.  Zero never occurs in a written chunk.
    pub timestamp: u64,
    pub checksum:  u32,
    pub ch:        u8,
}

fn fill_checksum(ch: u8, chunksize: u32) -> u32 {
    let mut h = crc32fast::Hasher::new();
    let block = [ch; 4096];
    let mut left = chunksize as usize - 2 * HEADER_LEN;
    while left > 0 {
        let n = left.min(block.len());
        h.update(&block[..n]);
        left -= n;
    }
    h.finalize()
}

fn now_us() -> u64 {
    let us = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1000;
    u64::try_from(us).unwrap_or(1).max(1)
}

impl Chunk {
    /// A chunk whose fill is `ch`
    ///
    /// # Panics
    ///
    /// If `chunksize` is less than [`MIN_CHUNK_SIZE`].
    pub fn new(chunk_no: u64, timestamp: u64, ch: u8, chunksize: u32) -> Self {
        assert!(chunksize >= MIN_CHUNK_SIZE, "chunk too small");
        let checksum = fill_checksum(ch, chunksize);
        Chunk{chunk_no, timestamp, checksum, ch}
    }

    /// A chunk with a random uppercase fill, stamped with the current time
    pub fn random<R: Rng>(rng: &mut R, chunk_no: u64, chunksize: u32) -> Self {
        let ch = b'A' + rng.gen_range(0..26);
        Chunk::new(chunk_no, now_us(), ch, chunksize)
    }

    /// Where this chunk lives in its file
    pub fn offset(&self, chunksize: u32) -> u64 {
        self.chunk_no * u64::from(chunksize)
    }

    /// Lay out the chunk's bytes in `buf`, which is one chunk long.
    pub fn fill(&self, buf: &mut [u8]) {
        let len = buf.len();
        let (head, rest) = buf.split_at_mut(HEADER_LEN);
        let (fill, tail) = rest.split_at_mut(len - 2 * HEADER_LEN);
        LittleEndian::write_u64(&mut head[0..8], self.chunk_no);
        LittleEndian::write_u64(&mut head[8..16], self.timestamp);
        LittleEndian::write_u32(&mut head[16..20], self.checksum);
        fill.fill(self.ch);
        LittleEndian::write_u32(&mut tail[0..4], self.checksum);
        LittleEndian::write_u64(&mut tail[4..12], self.timestamp);
        LittleEndian::write_u64(&mut tail[12..20], self.chunk_no);
    }

    /// Read back the chunk that `buf` claims to hold.
    ///
    /// The identifying fields come from the tail, so a chunk whose tail was
    /// lost reads as a hole.
    pub fn decode(buf: &[u8]) -> Self {
        let tail = &buf[buf.len() - HEADER_LEN..];
        Chunk {
            chunk_no: LittleEndian::read_u64(&tail[12..20]),
            timestamp: LittleEndian::read_u64(&tail[4..12]),
            checksum: LittleEndian::read_u32(&tail[0..4]),
            ch: buf[HEADER_LEN],
        }
    }

    /// Write this chunk into its place in `f`
    pub fn write(&self, f: &File, chunksize: u32) -> Result<()> {
        let mut buf = vec![0u8; chunksize as usize];
        self.fill(&mut buf);
        fileops::pwrite_all(f, &buf, self.offset(chunksize))
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t{}", self.chunk_no, self.timestamp,
               self.checksum, char::from(self.ch))
    }
}

impl FromStr for Chunk {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut fields = s.split('\t');
        let mut field = |name: &str| fields.next()
            .ok_or_else(|| format!("missing {name}"));
        let chunk_no = field("chunk number")?
            .parse::<u64>()
            .map_err(|e| format!("bad chunk number: {e}"))?;
        let timestamp = field("timestamp")?
            .parse::<u64>()
            .map_err(|e| format!("bad timestamp: {e}"))?;
        let checksum = field("checksum")?
            .parse::<u32>()
            .map_err(|e| format!("bad checksum: {e}"))?;
        let ch = match field("fill character")?.as_bytes() {
            [c] => *c,
            _ => return Err("expected a single fill character".to_owned())
        };
        if fields.next().is_some() {
            return Err("trailing fields".to_owned());
        }
        Ok(Chunk{chunk_no, timestamp, checksum, ch})
    }
}

/// The chunks recorded in a write log
pub fn read_log<R: BufRead>(r: R) -> impl Iterator<Item = Result<Chunk>> {
    r.lines().enumerate().map(|(i, l)| {
        l?.parse::<Chunk>().map_err(|reason| Error::Log{line: i + 1, reason})
    })
}

/// Fill a new file of `file_size` bytes with chunks, logging each one.
///
/// Chunk 0 always goes first.  With `shuffle`, the rest follow in random
/// order; otherwise in file order.  The last chunk may extend past
/// `file_size`.
pub fn write_file<R: Rng>(
    rng: &mut R,
    path: &Path,
    log: &Path,
    file_size: u64,
    chunksize: u32,
    shuffle: bool,
    verbose: bool
) -> Result<()> {
    let num_chunks = div_roundup(file_size, u64::from(chunksize));
    let mut order = (0..num_chunks).collect::<Vec<_>>();
    if shuffle && order.len() > 1 {
        order[1..].shuffle(rng);
    }
    let f = fileops::create_trunc(path)?;
    let mut log = LogWriter::create(log, true)?;
    for chunk_no in order {
        let c = Chunk::random(rng, chunk_no, chunksize);
        if verbose {
            println!("Process {} writing #{chunk_no} chunk to file {}",
                     std::process::id(), path.display());
        }
        c.write(&f, chunksize)?;
        log.append(&c)?;
    }
    log.flush()
}

/// Read one chunk, returning how many bytes the file had for it
fn read_chunk(f: &File, buf: &mut [u8], offset: u64) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match f.read_at(&mut buf[got..], offset + got as u64).op("pread")? {
            0 => break,
            n => got += n
        }
    }
    Ok(got)
}

/// Checks a chunked file against its write log
#[derive(Clone, Debug)]
pub struct ChunkVerifier {
    chunksize: u32,
    expected:  Vec<Option<Chunk>>,
}

impl ChunkVerifier {
    /// Verify the first `file_size / chunksize` chunks
    ///
    /// # Panics
    ///
    /// If `chunksize` is less than [`MIN_CHUNK_SIZE`].
    pub fn new(file_size: u64, chunksize: u32) -> Self {
        assert!(chunksize >= MIN_CHUNK_SIZE, "chunk too small");
        let n = (file_size / u64::from(chunksize)) as usize;
        ChunkVerifier{chunksize, expected: vec![None; n]}
    }

    /// Record one logged chunk.  The most recent write of each chunk wins.
    pub fn record(&mut self, c: Chunk) -> Result<()> {
        let n = self.expected.len();
        let slot = usize::try_from(c.chunk_no)
            .ok()
            .and_then(|i| self.expected.get_mut(i))
            .ok_or_else(|| Error::check(format_args!(
                "chunk {} from the write log lies beyond the last of {n} \
                 chunks; the file size may be too small", c.chunk_no)))?;
        if slot.map_or(true, |old| old.timestamp <= c.timestamp) {
            *slot = Some(c);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// Check every chunk of `f`
    pub fn verify(&self, f: &File, verbose: bool) -> Result<()> {
        let cs = self.chunksize as usize;
        let mut buf = vec![0u8; cs];
        let mut expected_buf = vec![0u8; cs];
        for (i, expected) in self.expected.iter().enumerate() {
            let offset = i as u64 * u64::from(self.chunksize);
            buf.fill(0);
            let got = read_chunk(f, &mut buf, offset)?;
            let found = Chunk::decode(&buf);
            let Some(expected) = expected else {
                if verbose {
                    println!("  verifying #{i} chunk out of write records");
                }
                if found.timestamp == 0 {
                    debug!(chunk = i, "hole");
                    continue;
                }
                if found.chunk_no != i as u64 {
                    return Err(Error::check(format_args!(
                        "Chunk no expected: {i}, Found: {}", found.chunk_no)));
                }
                let sum = fill_checksum(found.ch, self.chunksize);
                if sum != found.checksum {
                    return Err(Error::check(format_args!(
                        "chunk {i}: checksum expected: {sum} Found: {}",
                        found.checksum)));
                }
                continue;
            };
            if verbose {
                println!("  verifying #{i} chunk in write records");
            }
            if got < cs {
                return Err(Error::ShortRead{offset, wanted: cs, got});
            }
            expected.fill(&mut expected_buf);
            let mut bad = expected_buf.iter()
                .zip(buf.iter())
                .enumerate()
                .filter(|(_, (e, f))| e != f);
            if let Some((pos, (&e, &fb))) = bad.next() {
                return Err(Error::Corrupt {
                    what: format!("Inconsistent chunk {i}: expected \
                                   [{expected}] found [{found}]"),
                    offset: offset + pos as u64,
                    expected: e,
                    found: fb,
                    count: 1 + bad.count(),
                });
            }
        }
        Ok(())
    }
}

// LCOV_EXCL_STOP
