// vim: tw=80
//! Thin wrappers around the file system calls the programs make.
//!
//! Each wrapper labels its error with the failing operation, and the data path
//! wrappers treat a short transfer as a failure rather than retrying it.

use std::{
    fs::{File, OpenOptions},
    os::unix::{fs::{FileExt, OpenOptionsExt}, io::AsRawFd},
    path::Path,
};

use nix::errno::Errno;
use tracing::debug;

use crate::{pattern::Pattern, types::*};

/// Open `path` read-write, creating it with mode 0644 if needed.
pub fn open_rw(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o644)
        .open(path)
        .op("open")
}

/// Open `path` read-write, creating it or truncating it to zero length.
pub fn create_trunc(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .op("open")
}

/// Open `path` read-only
pub fn open_ro(path: &Path) -> Result<File> {
    File::open(path).op("open")
}

/// Read exactly `buf.len()` bytes at `offset` with a single `pread`.
pub fn pread_exact(f: &File, buf: &mut [u8], offset: u64) -> Result<()> {
    let got = f.read_at(buf, offset).op("pread")?;
    if got != buf.len() {
        return Err(Error::ShortRead{offset, wanted: buf.len(), got});
    }
    Ok(())
}

/// Write all of `buf` at `offset` with a single `pwrite`.
pub fn pwrite_all(f: &File, buf: &[u8], offset: u64) -> Result<()> {
    let got = f.write_at(buf, offset).op("pwrite")?;
    if got != buf.len() {
        return Err(Error::ShortWrite{offset, wanted: buf.len(), got});
    }
    Ok(())
}

/// The file's current size, as reported by `fstat`
pub fn i_size(f: &File) -> Result<u64> {
    Ok(f.metadata().op("fstat")?.len())
}

pub fn ftruncate(f: &File, len: u64) -> Result<()> {
    f.set_len(len).op("ftruncate")
}

/// Truncate by path, without an open file descriptor
pub fn truncate_path(path: &Path, len: u64) -> Result<()> {
    let len = libc::off_t::try_from(len).map_err(|_| Error::sys("truncate",
        Errno::EFBIG))?;
    nix::unistd::truncate(path, len).op("truncate")
}

pub fn fsync(f: &File) -> Result<()> {
    f.sync_all().op("fsync")
}

/// Evict the file's clean pages from the page cache, so the next read comes
/// from stable storage.
///
/// The file must already be synced.  Pages that are still dirty stay cached.
pub fn drop_cache(f: &File) -> Result<()> {
    // posix_fadvise returns the error number directly instead of using errno
    let r = unsafe {
        libc::posix_fadvise(f.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED)
    };
    if r != 0 {
        return Err(Error::sys("posix_fadvise", Errno::from_raw(r)));
    }
    Ok(())
}

/// Fill the first `clusters` clusters of `f` with copies of `pattern`.
///
/// If `scratch` is given, every cluster is also written to it at the same
/// offset, in alternation with the main file.  That interleaving fragments the
/// main file's allocation.
pub fn fill_with_pattern(
    f: &File,
    pattern: &Pattern,
    clusters: u64,
    scratch: Option<&File>,
) -> Result<()> {
    let cs = pattern.len() as u64;
    for i in 0..clusters {
        pwrite_all(f, pattern, i * cs)?;
        if let Some(s) = scratch {
            pwrite_all(s, pattern, i * cs)?;
        }
    }
    debug!(clusters, cluster_size = cs, "filled file with pattern");
    Ok(())
}

// LCOV_EXCL_STOP
