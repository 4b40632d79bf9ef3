// vim: tw=80
//! Space reservation: allocate unwritten extents and punch holes.
//!
//! OCFS2 exposes this through XFS-compatible ioctls.  Linux's VFS knows the
//! same ioctl numbers as `FS_IOC_RESVSP64` and `FS_IOC_UNRESVSP64`, and turns
//! them into `fallocate(2)` calls on any file system that supports that.  The
//! hole programs can also call `fallocate(2)` directly.

use std::{fmt, fs::File, os::unix::io::AsRawFd, str::FromStr};

use nix::errno::Errno;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::debug;

use crate::types::*;

mod ffi {
    use nix::ioctl_write_ptr;

    /// `struct ocfs2_space_resv`, which mirrors XFS's `struct xfs_flock64`
    #[repr(C)]
    #[allow(non_camel_case_types)]
    #[derive(Clone, Copy, Debug, Default)]
    #[doc(hidden)]
    pub struct ocfs2_space_resv {
        pub l_type:   i16,
        pub l_whence: i16,
        pub l_start:  i64,
        pub l_len:    i64,
        pub l_sysid:  i32,
        pub l_pid:    u32,
        pub l_pad:    [i32; 4],
    }

    ioctl_write_ptr! {
        /// Reserve space as unwritten extents
        #[doc(hidden)]
        ocfs2_ioc_resvsp64, b'X', 42, ocfs2_space_resv
    }

    ioctl_write_ptr! {
        /// Release space, leaving a hole
        #[doc(hidden)]
        ocfs2_ioc_unresvsp64, b'X', 43, ocfs2_space_resv
    }
}

use ffi::{ocfs2_ioc_resvsp64, ocfs2_ioc_unresvsp64, ocfs2_space_resv};

/// Where `l_start` is measured from
#[derive(Clone, Copy, Debug, Eq, IntoPrimitive, PartialEq, TryFromPrimitive)]
#[repr(i16)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl FromStr for Whence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i16>()
            .ok()
            .and_then(|w| Whence::try_from(w).ok())
            .ok_or_else(|| format!("invalid whence {s:?}: expected 0, 1, or 2"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResvOp {
    /// `OCFS2_IOC_RESVSP64`
    Reserve,
    /// `OCFS2_IOC_UNRESVSP64`
    Unreserve,
}

impl FromStr for ResvOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resv" => Ok(ResvOp::Reserve),
            "unresv" => Ok(ResvOp::Unreserve),
            _ => Err(format!("invalid command {s:?}: expected resv or unresv"))
        }
    }
}

impl fmt::Display for ResvOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResvOp::Reserve => f.write_str("resv"),
            ResvOp::Unreserve => f.write_str("unresv"),
        }
    }
}

/// Issue one of the OCFS2 space reservation ioctls
pub fn space_resv(
    f: &File,
    op: ResvOp,
    whence: Whence,
    start: i64,
    len: i64,
) -> Result<()> {
    let sr = ocfs2_space_resv {
        l_whence: whence.into(),
        l_start: start,
        l_len: len,
        ..Default::default()
    };
    debug!(%op, ?whence, start, len, "space reservation ioctl");
    // Safe because sr outlives the call, and the kernel only reads it.
    let r = unsafe {
        match op {
            ResvOp::Reserve => ocfs2_ioc_resvsp64(f.as_raw_fd(), &sr),
            ResvOp::Unreserve => ocfs2_ioc_unresvsp64(f.as_raw_fd(), &sr),
        }
    };
    r.map(drop).op("ioctl")
}

/// Which interface reserves space and punches holes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Method {
    /// `OCFS2_IOC_RESVSP64` and `OCFS2_IOC_UNRESVSP64`
    #[default]
    Ocfs2,
    /// `fallocate(2)`
    Fallocate,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ocfs2" => Ok(Method::Ocfs2),
            "fallocate" => Ok(Method::Fallocate),
            _ => Err(format!("invalid method {s:?}: expected ocfs2 or \
                             fallocate"))
        }
    }
}

fn fallocate(f: &File, mode: libc::c_int, offset: u64, len: u64) -> Result<()>
{
    let offset = libc::off_t::try_from(offset)
        .map_err(|_| Error::sys("fallocate", Errno::EFBIG))?;
    let len = libc::off_t::try_from(len)
        .map_err(|_| Error::sys("fallocate", Errno::EFBIG))?;
    let r = unsafe { libc::fallocate(f.as_raw_fd(), mode, offset, len) };
    Errno::result(r).map(drop).op("fallocate")
}

fn resv_args(offset: u64, len: u64) -> Result<(i64, i64)> {
    let start = i64::try_from(offset)
        .map_err(|_| Error::sys("ioctl", Errno::EFBIG))?;
    let len = i64::try_from(len)
        .map_err(|_| Error::sys("ioctl", Errno::EFBIG))?;
    Ok((start, len))
}

/// Allocate unwritten extents over `[offset, offset + len)` without changing
/// the file size.
pub fn reserve(f: &File, method: Method, offset: u64, len: u64) -> Result<()> {
    match method {
        Method::Ocfs2 => {
            let (start, len) = resv_args(offset, len)?;
            space_resv(f, ResvOp::Reserve, Whence::Set, start, len)
        }
        Method::Fallocate => fallocate(f, libc::FALLOC_FL_KEEP_SIZE, offset,
                                       len)
    }
}

/// Deallocate `[offset, offset + len)`, leaving a hole that reads as zeros.
pub fn punch(f: &File, method: Method, offset: u64, len: u64) -> Result<()> {
    match method {
        Method::Ocfs2 => {
            let (start, len) = resv_args(offset, len)?;
            space_resv(f, ResvOp::Unreserve, Whence::Set, start, len)
        }
        Method::Fallocate => fallocate(f,
            libc::FALLOC_FL_PUNCH_HOLE | libc::FALLOC_FL_KEEP_SIZE,
            offset, len)
    }
}

// LCOV_EXCL_STOP
