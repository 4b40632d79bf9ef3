// vim: tw=80
//! Support library for the o2torture programs
//!
//! Each program in the `o2torture` crate is a standalone scenario runner.  This
//! crate holds the pieces that several of them share: the error type, the
//! verification pattern, thin file operation wrappers, and the on-disk or
//! on-log formats that more than one program needs to agree on.

// I don't find this lint very helpful
#![allow(clippy::type_complexity)]

pub mod chunk;
pub mod defrag;
pub mod fileops;
pub mod hole_map;
pub mod limits;
pub mod logline;
pub mod mmap;
pub mod pattern;
pub mod racer;
pub mod resv;
pub mod superblock;
pub mod truncate;
pub mod types;
pub mod util;
pub mod write_log;

pub use crate::types::*;
pub use crate::util::*;
