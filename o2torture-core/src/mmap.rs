// vim: tw=80
//! Shared file mappings
//!
//! Accesses go through volatile loads and stores, because another racer (or
//! another cluster node) may change the file underneath the mapping at any
//! time.

use std::{
    ffi::c_void,
    fs::File,
    num::NonZeroUsize,
    ptr::{self, NonNull},
    sync::atomic::{AtomicU64, Ordering},
};

use nix::{
    errno::Errno,
    sys::{
        mman::{mmap, munmap, MapFlags, ProtFlags},
        signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
    },
    unistd::{sysconf, SysconfVar},
};
use tracing::warn;

use crate::types::*;

static SIGBUS_COUNT: AtomicU64 = AtomicU64::new(0);

extern "C" fn on_sigbus(_: libc::c_int) {
    SIGBUS_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Survive `SIGBUS` from accessing a mapping beyond the end of its file.
///
/// The faulting access is simply retried when the handler returns, so a racer
/// that touches a truncated page spins until some other racer extends the file
/// again.
pub fn tolerate_sigbus() -> Result<()> {
    let sa = SigAction::new(SigHandler::Handler(on_sigbus), SaFlags::empty(),
                            SigSet::empty());
    // Safe because the handler only touches an atomic
    unsafe { sigaction(Signal::SIGBUS, &sa) }.map(drop).op("sigaction")
}

/// How many times `SIGBUS` has been caught since startup
pub fn sigbus_count() -> u64 {
    SIGBUS_COUNT.load(Ordering::Relaxed)
}

/// The VM page size
pub fn page_size() -> Result<usize> {
    sysconf(SysconfVar::PAGE_SIZE)
        .op("sysconf")?
        .and_then(|ps| usize::try_from(ps).ok())
        .ok_or_else(|| Error::check("page size is unknown"))
}

/// A `MAP_SHARED` mapping of the start of a file
#[derive(Debug)]
pub struct MappedFile {
    ptr:      NonNull<c_void>,
    len:      usize,
    writable: bool,
}

// The mapping is just memory shared with the kernel; nothing ties it to the
// thread that created it.
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    fn map(f: &File, len: usize, writable: bool) -> Result<Self> {
        let nzlen = NonZeroUsize::new(len)
            .ok_or(Error::sys("mmap", Errno::EINVAL))?;
        let prot = if writable {
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE
        } else {
            ProtFlags::PROT_READ
        };
        // Safe because we never hand out references into the mapping that
        // outlive it.
        let ptr = unsafe {
            mmap(None, nzlen, prot, MapFlags::MAP_SHARED, f, 0)
        }.op("mmap")?;
        Ok(MappedFile{ptr, len, writable})
    }

    /// Map the first `len` bytes of `f` for reading and writing
    pub fn shared_rw(f: &File, len: usize) -> Result<Self> {
        Self::map(f, len, true)
    }

    /// Map the first `len` bytes of `f` read-only
    pub fn shared_ro(f: &File, len: usize) -> Result<Self> {
        Self::map(f, len, false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn base(&self) -> *mut u8 {
        self.ptr.as_ptr().cast::<u8>()
    }

    /// Store a single byte
    ///
    /// # Panics
    ///
    /// If `offset` is beyond the mapping, or the mapping is read-only.
    pub fn store(&self, offset: usize, byte: u8) {
        assert!(self.writable, "store to a read-only mapping");
        assert!(offset < self.len, "store beyond the mapping");
        // Safe because offset is in bounds
        unsafe { ptr::write_volatile(self.base().add(offset), byte) }
    }

    /// Store `len` copies of `byte` starting at `offset`
    ///
    /// # Panics
    ///
    /// If the range extends beyond the mapping, or the mapping is read-only.
    pub fn fill(&self, offset: usize, len: usize, byte: u8) {
        assert!(self.writable, "store to a read-only mapping");
        assert!(offset + len <= self.len, "store beyond the mapping");
        for i in offset..offset + len {
            // Safe because i is in bounds
            unsafe { ptr::write_volatile(self.base().add(i), byte) }
        }
    }

    /// Copy bytes out of the mapping, starting at `offset`
    ///
    /// # Panics
    ///
    /// If the range extends beyond the mapping.
    pub fn read(&self, offset: usize, buf: &mut [u8]) {
        assert!(offset + buf.len() <= self.len, "load beyond the mapping");
        for (i, b) in buf.iter_mut().enumerate() {
            // Safe because offset + i is in bounds
            *b = unsafe { ptr::read_volatile(self.base().add(offset + i)) };
        }
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        // Safe because nothing can reference the mapping anymore
        if let Err(e) = unsafe { munmap(self.ptr, self.len) } {
            warn!("munmap: {e}");
        }
    }
}

// LCOV_EXCL_STOP
