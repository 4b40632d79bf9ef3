// vim: tw=80
//! Common type definitions used throughout o2torture

use std::{fmt, io};

use nix::errno::Errno;
use thiserror::Error;

/// Everything that can make a torture program fail.
///
/// A failed system call keeps its `errno`, which becomes the process exit
/// status.  Every other failure is a verification failure.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("{op} failed: {} ({})", errnum(.errno), errdesc(.errno))]
    Sys {
        op:    &'static str,
        errno: Errno
    },
    #[error("{what}: {count} bad bytes, first at offset {offset:#x}: \
             expected {:?} found {:?}",
             as_char(.expected), as_char(.found))]
    Corrupt {
        what:     String,
        offset:   u64,
        expected: u8,
        found:    u8,
        count:    usize,
    },
    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        offset: u64,
        wanted: usize,
        got:    usize
    },
    #[error("short write at offset {offset}: wanted {wanted} bytes, wrote \
            {got}")]
    ShortWrite {
        offset: u64,
        wanted: usize,
        got:    usize
    },
    #[error("log line {line}: {reason}")]
    Log {
        line:   usize,
        reason: String
    },
    /// A racer's child process failed.  `status` is its exit status.
    #[error("racer {name} failed with exit status {status}")]
    Racer {
        name:   String,
        status: i32
    },
    #[error("not an OCFS2 volume")]
    NotOcfs2,
    #[error("{0}")]
    Check(String),
}

impl Error {
    /// Construct an `Error::Check` from anything printable
    pub fn check<D: fmt::Display>(d: D) -> Self {
        Error::Check(d.to_string())
    }

    /// The process exit status that reports this error.
    ///
    /// Failed system calls exit with their `errno`, and failed racers with
    /// their own exit status.  Verification failures exit with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Sys{errno, ..} => *errno as i32,
            Error::Racer{status, ..} => *status,
            _ => 1
        }
    }

    /// Attach an operation label to a raw `Errno`
    pub fn sys(op: &'static str, errno: Errno) -> Self {
        Error::Sys{op, errno}
    }

    /// The `Errno` of a failed system call, if that's what this is.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Sys{errno, ..} => Some(*errno),
            _ => None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        let errno = e.raw_os_error()
            .map(Errno::from_raw)
            .unwrap_or(Errno::EIO);
        Error::Sys{op: "I/O", errno}
    }
}

impl From<nix::Error> for Error {
    fn from(errno: nix::Error) -> Self {
        Error::Sys{op: "system call", errno}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn errnum(errno: &Errno) -> i32 {
    *errno as i32
}

fn errdesc(errno: &Errno) -> &'static str {
    errno.desc()
}

fn as_char(b: &u8) -> char {
    char::from(*b)
}

/// Label the error of a system call with the operation that failed.
pub trait SysContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> SysContext<T> for std::result::Result<T, Errno> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|errno| Error::Sys{op, errno})
    }
}

impl<T> SysContext<T> for std::result::Result<T, io::Error> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|e| match Error::from(e) {
            Error::Sys{errno, ..} => Error::Sys{op, errno},
            other => other
        })
    }
}

// LCOV_EXCL_STOP
