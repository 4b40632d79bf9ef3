// vim: tw=80
//! Reserve or release file space with the OCFS2 space reservation ioctls

use std::{fs::OpenOptions, os::unix::fs::OpenOptionsExt, path::PathBuf,
          process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{
    resv::{space_resv, ResvOp, Whence},
    SysContext,
};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Issue OCFS2_IOC_RESVSP64 or OCFS2_IOC_UNRESVSP64 on a file
struct Cli {
    path:   PathBuf,
    /// resv or unresv
    cmd:    ResvOp,
    /// 0 for SEEK_SET, 1 for SEEK_CUR, 2 for SEEK_END
    whence: Whence,
    /// Start of the range, in bytes, relative to whence
    #[clap(allow_negative_numbers = true)]
    start:  i64,
    /// Length of the range, in bytes
    #[clap(allow_negative_numbers = true)]
    size:   i64,
}

impl Cli {
    fn main(self) -> Result<()> {
        println!("File: {}", self.path.display());
        println!("cmd = {}", self.cmd);
        println!("l_whence = {}", i16::from(self.whence));
        println!("l_start = {}", self.start);
        println!("l_len = {}", self.size);
        let f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(&self.path)
            .op("open")?;
        space_resv(&f, self.cmd, self.whence, self.start, self.size)
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
