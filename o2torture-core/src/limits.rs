// vim: tw=80
//! The largest file offset OCFS2 allows

use std::fs::File;

use nix::{
    errno::Errno,
    sys::signal::{signal, SigHandler, Signal},
};
use tracing::info;

use crate::{fileops, types::*};

/// Written so that it ends at the maximum offset
pub const TEST_STR: &[u8] = b"Hello World";

/// Describes the volume and the machine, as far as file size limits go
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Geometry {
    pub blocksize_bits:   u32,
    pub clustersize_bits: u32,
    pub bits_per_long:    u32,
    pub page_size:        u64,
    /// Whether a 32-bit kernel was built with large block device support
    pub config_lbd:       bool,
}

impl Geometry {
    /// Byte offset of the last byte that a file may contain.
    ///
    /// OCFS2 addresses 32 bits' worth of clusters.  A 32-bit kernel is further
    /// limited by its page cache index, or without large block device support,
    /// by its sector numbers.
    pub fn max_file_offset(&self) -> u64 {
        let mut bytes = 1u64 << self.clustersize_bits;
        let mut trim = bytes;
        let mut shift = 32;
        if self.bits_per_long == 32 {
            if self.config_lbd {
                if bytes > self.page_size {
                    bytes = self.page_size;
                    trim = 1;
                    shift = 31;
                }
            } else {
                bytes = 1 << self.blocksize_bits;
                trim = 1;
                shift = 31;
            }
        }
        (bytes << shift) - trim
    }
}

/// The native word size of this machine
pub fn bits_per_long() -> u32 {
    libc::c_long::BITS
}

/// Writes past the file size limit should fail with `EFBIG` rather than kill
/// the process.
pub fn ignore_sigxfsz() -> Result<()> {
    // Safe because SigIgn installs no handler code
    unsafe { signal(Signal::SIGXFSZ, SigHandler::SigIgn) }
        .map(drop)
        .op("signal")
}

/// Growing the file one byte past `max_off` must fail with `EFBIG`.
pub fn check_efbig(f: &File, max_off: u64) -> Result<()> {
    match fileops::ftruncate(f, max_off + 1) {
        Err(Error::Sys{errno: Errno::EFBIG, ..}) => {
            info!(max_off, "ftruncate past max_off failed with EFBIG");
            Ok(())
        }
        Ok(()) => Err(Error::check(
            "Test to ftruncate past max_off failed: it succeeded")),
        Err(e) => Err(Error::check(format_args!(
            "Test to ftruncate past max_off failed: {e}"))),
    }
}

/// Write [`TEST_STR`] so that it ends at `max_off`, and read it back.
pub fn check_write_at_max(f: &File, max_off: u64) -> Result<()> {
    let offset = max_off - TEST_STR.len() as u64;
    fileops::pwrite_all(f, TEST_STR, offset)?;
    let mut buf = vec![0u8; TEST_STR.len()];
    fileops::pread_exact(f, &mut buf, offset)?;
    if buf != TEST_STR {
        return Err(Error::check(format_args!(
            "Buffer read back does not match. Wrote: {:?} Read: {:?}",
            String::from_utf8_lossy(TEST_STR), String::from_utf8_lossy(&buf))));
    }
    info!(offset, "read back data written at max_off");
    Ok(())
}

// LCOV_EXCL_STOP
