// vim: tw=80
//! Check that OCFS2 honors its maximum file size: one byte past it must fail
//! with `EFBIG`, and I/O ending exactly at it must work.

use std::{path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{
    fileops,
    limits::{self, Geometry},
    mmap::page_size,
    superblock::Superblock,
};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Probe the largest file offset OCFS2 supports
struct Cli {
    /// log2 of the file system's block size
    #[clap(short = 'b', required_unless_present = "device",
           value_parser = clap::value_parser!(u32).range(9..=12))]
    blocksize_bits:   Option<u32>,
    /// log2 of the file system's cluster size
    #[clap(short = 'c', required_unless_present = "device",
           value_parser = clap::value_parser!(u32).range(12..=20))]
    clustersize_bits: Option<u32>,
    /// Word size of the kernel, if not the same as this program's
    #[clap(short = 'B', value_parser = ["32", "64"])]
    bits_per_long:    Option<String>,
    /// Page size of the kernel, if not the same as this machine's
    #[clap(short = 'P')]
    page_size:        Option<u64>,
    /// Whether a 32-bit kernel has large block device support
    #[clap(short = 'L', default_value_t = 1,
           value_parser = clap::value_parser!(u8).range(0..=1))]
    config_lbd:       u8,
    /// OCFS2 device holding FILE.  Its superblock supplies the block and
    /// cluster sizes.
    #[clap(short = 'd', long, conflicts_with_all = ["blocksize_bits",
                                                    "clustersize_bits"])]
    device:           Option<PathBuf>,
    /// File to create.  It is truncated if it already exists.
    file:             PathBuf,
}

impl Cli {
    fn geometry(&self) -> Result<Geometry> {
        let (blocksize_bits, clustersize_bits) = match &self.device {
            Some(dev) => {
                let sb = Superblock::open(dev)?;
                (sb.blocksize_bits, sb.clustersize_bits)
            }
            // Clap guarantees both are set without a device
            None => (self.blocksize_bits.unwrap_or_default(),
                     self.clustersize_bits.unwrap_or_default())
        };
        let bits_per_long = match self.bits_per_long.as_deref() {
            Some("32") => 32,
            Some(_) => 64,
            None => limits::bits_per_long()
        };
        let page_size = match self.page_size {
            Some(ps) => ps,
            None => page_size()? as u64
        };
        Ok(Geometry {
            blocksize_bits,
            clustersize_bits,
            bits_per_long,
            page_size,
            config_lbd: self.config_lbd != 0,
        })
    }

    fn main(self) -> Result<()> {
        limits::ignore_sigxfsz()?;
        let g = self.geometry()?;
        let max_off = g.max_file_offset();
        println!("CONFIG: bbits: {}, cbits: {}, page size: {}, config_lbd: {}, \
                  bits_per_long: {}, max_off: {max_off}",
                 g.blocksize_bits, g.clustersize_bits, g.page_size,
                 u8::from(g.config_lbd), g.bits_per_long);
        let f = fileops::create_trunc(&self.file)?;
        limits::check_efbig(&f, max_off)?;
        limits::check_write_at_max(&f, max_off)?;
        println!("All tests passed.");
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
