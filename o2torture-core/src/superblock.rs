// vim: tw=80
//! Read the few OCFS2 superblock fields the programs need

use std::{fs::File, os::unix::fs::FileExt, path::Path};

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::{fileops, types::*};

/*
 * On-disk superblock location:
 *
 * The superblock is an inode stored in block 2 of the volume, for whatever the
 * volume's block size is.  Since the block size is recorded in the superblock
 * itself, it must be found by probing each legal block size in turn.
 *
 * Inode (ocfs2_dinode) fields used here:
 *
 * 0x00     i_signature         8 bytes     "OCFSV2" followed by padding
 * 0xC0     id2                 the superblock proper, below
 *
 * Superblock (ocfs2_super_block) fields, relative to id2, little-endian:
 *
 * 0x20     s_feature_incompat  4 bytes
 * 0x38     s_blocksize_bits    4 bytes
 * 0x3C     s_clustersize_bits  4 bytes
 * 0x40     s_max_slots         2 bytes
 * 0x50     s_label             64 bytes    NUL-padded
 * 0x90     s_uuid              16 bytes
 */
const SIGNATURE: &[u8] = b"OCFSV2";
const SUPER_BLOCK_BLKNO: u64 = 2;
const ID2: usize = 0xC0;
const FEATURE_INCOMPAT: usize = ID2 + 0x20;
const BLOCKSIZE_BITS: usize = ID2 + 0x38;
const CLUSTERSIZE_BITS: usize = ID2 + 0x3C;
const MAX_SLOTS: usize = ID2 + 0x40;
const LABEL: usize = ID2 + 0x50;
const LABEL_LEN: usize = 64;
const UUID: usize = ID2 + 0x90;
const UUID_LEN: usize = 16;

pub const MIN_BLOCKSIZE_BITS: u32 = 9;
pub const MAX_BLOCKSIZE_BITS: u32 = 12;
pub const MIN_CLUSTERSIZE_BITS: u32 = 12;
pub const MAX_CLUSTERSIZE_BITS: u32 = 20;

/// The interesting parts of an OCFS2 superblock
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Superblock {
    pub blocksize_bits:   u32,
    pub clustersize_bits: u32,
    pub max_slots:        u16,
    pub feature_incompat: u32,
    pub label:            String,
    pub uuid:             [u8; UUID_LEN],
}

impl Superblock {
    pub fn blocksize(&self) -> u64 {
        1 << self.blocksize_bits
    }

    pub fn clustersize(&self) -> u64 {
        1 << self.clustersize_bits
    }

    /// Open a device or image file and read its superblock
    pub fn open(path: &Path) -> Result<Self> {
        let f = fileops::open_ro(path)?;
        Self::read_from(&f)
    }

    /// Find the superblock by trying every legal block size.
    pub fn read_from(f: &File) -> Result<Self> {
        for bits in MIN_BLOCKSIZE_BITS..=MAX_BLOCKSIZE_BITS {
            let bs = 1usize << bits;
            let mut buf = vec![0u8; bs];
            let got = f.read_at(&mut buf, SUPER_BLOCK_BLKNO * bs as u64)
                .op("pread")?;
            if got < bs {
                debug!(blocksize = bs, "volume too small for block size");
                continue;
            }
            if let Some(sb) = Self::parse(&buf, bits)? {
                return Ok(sb);
            }
        }
        Err(Error::NotOcfs2)
    }

    /// Parse one candidate superblock, read assuming a block size of
    /// `1 << bits`.
    ///
    /// Returns `None` if the buffer does not hold a superblock for that block
    /// size.
    pub fn parse(buf: &[u8], bits: u32) -> Result<Option<Self>> {
        if buf.len() < UUID + UUID_LEN || &buf[..SIGNATURE.len()] != SIGNATURE
        {
            return Ok(None);
        }
        let blocksize_bits = LittleEndian::read_u32(&buf[BLOCKSIZE_BITS..]);
        if blocksize_bits != bits {
            return Ok(None);
        }
        let clustersize_bits = LittleEndian::read_u32(&buf[CLUSTERSIZE_BITS..]);
        if !(MIN_CLUSTERSIZE_BITS..=MAX_CLUSTERSIZE_BITS)
            .contains(&clustersize_bits)
        {
            return Err(Error::check(format_args!(
                "corrupt superblock: cluster size bits {clustersize_bits}")));
        }
        let raw_label = &buf[LABEL..LABEL + LABEL_LEN];
        let label_len = raw_label.iter()
            .position(|&b| b == 0)
            .unwrap_or(LABEL_LEN);
        let mut uuid = [0u8; UUID_LEN];
        uuid.copy_from_slice(&buf[UUID..UUID + UUID_LEN]);
        Ok(Some(Superblock {
            blocksize_bits,
            clustersize_bits,
            max_slots: LittleEndian::read_u16(&buf[MAX_SLOTS..]),
            feature_incompat: LittleEndian::read_u32(&buf[FEATURE_INCOMPAT..]),
            label: String::from_utf8_lossy(&raw_label[..label_len])
                .into_owned(),
            uuid
        }))
    }

    /// The UUID in the usual upper-case hex form
    pub fn uuid_string(&self) -> String {
        self.uuid.iter().map(|b| format!("{b:02X}")).collect()
    }
}

// LCOV_EXCL_STOP
