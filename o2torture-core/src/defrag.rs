// vim: tw=80
//! Online defragmentation with `OCFS2_IOC_MOVE_EXT`

use std::{fs::File, os::unix::io::AsRawFd, ptr};

use tracing::debug;

use crate::types::*;

mod ffi {
    use nix::ioctl_write_ptr;

    /// `struct ocfs2_move_extents`.  All values are in bytes, except for
    /// `me_goal`, which is in blocks.
    #[repr(C)]
    #[allow(non_camel_case_types)]
    #[derive(Clone, Copy, Debug, Default)]
    #[doc(hidden)]
    pub struct ocfs2_move_extents {
        pub me_start:      u64,
        pub me_len:        u64,
        pub me_goal:       u64,
        pub me_threshold:  u64,
        pub me_flags:      u64,
        pub me_moved_len:  u64,
        pub me_new_offset: u64,
        pub me_reserved:   [u32; 2],
    }

    // The kernel declares this one _IOW, even though it writes its results
    // back into the argument.
    ioctl_write_ptr! {
        /// Move or defragment a range of a file's extents
        #[doc(hidden)]
        ocfs2_ioc_move_ext, b'o', 6, ocfs2_move_extents
    }
}

use ffi::{ocfs2_ioc_move_ext, ocfs2_move_extents};

/// Let the file system pick where the extents go
pub const OCFS2_MOVE_EXT_FL_AUTO_DEFRAG: u64 = 0x1;
/// Only defragment, without also moving extents closer together
pub const OCFS2_MOVE_EXT_FL_PART_DEFRAG: u64 = 0x2;
/// Set by the kernel once the whole range was handled
pub const OCFS2_MOVE_EXT_FL_COMPLETE: u64 = 0x4;

/// What to defragment
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefragRange {
    pub start:     u64,
    pub len:       u64,
    /// Extents farther apart than this are candidates for merging.  Zero lets
    /// the kernel choose.
    pub threshold: u64,
}

/// What the kernel did
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DefragOutcome {
    pub moved_len: u64,
    pub complete:  bool,
}

impl DefragOutcome {
    fn from_raw(me: &ocfs2_move_extents) -> Self {
        DefragOutcome {
            moved_len: me.me_moved_len,
            complete: me.me_flags & OCFS2_MOVE_EXT_FL_COMPLETE != 0
        }
    }
}

/// Ask OCFS2 to defragment `range` of `f`, which must be open for writing.
pub fn defragment(f: &File, range: DefragRange) -> Result<DefragOutcome> {
    let mut me = ocfs2_move_extents {
        me_start: range.start,
        me_len: range.len,
        me_threshold: range.threshold,
        me_flags: OCFS2_MOVE_EXT_FL_AUTO_DEFRAG,
        ..Default::default()
    };
    debug!(?range, "move extents ioctl");
    // Safe because me outlives the call, and the pointer is derived from a
    // mutable borrow, so the kernel may write through it.
    unsafe {
        ocfs2_ioc_move_ext(f.as_raw_fd(), ptr::addr_of_mut!(me).cast_const())
    }.op("ioctl")?;
    Ok(DefragOutcome::from_raw(&me))
}

// LCOV_EXCL_STOP
