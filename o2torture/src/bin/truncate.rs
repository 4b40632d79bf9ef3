// vim: tw=80
//! Truncate a file to a given size

use std::{
    fs::OpenOptions,
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
    process::ExitCode,
};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{fileops, parse_size, SysContext};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Truncate a file, by path or through an O_DIRECT descriptor
struct Cli {
    path:   PathBuf,
    /// New size, in bytes.  Accepts a k, m, or g suffix.
    #[clap(value_parser = parse_size)]
    size:   u64,
    /// Open the file with O_DIRECT and truncate through the descriptor
    #[clap(long)]
    direct: bool,
}

impl Cli {
    fn main(self) -> Result<()> {
        println!("Truncating {} to {}", self.path.display(), self.size);
        if self.direct {
            let f = OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_DIRECT)
                .open(&self.path)
                .op("open")?;
            fileops::ftruncate(&f, self.size)
        } else {
            fileops::truncate_path(&self.path, self.size)
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
