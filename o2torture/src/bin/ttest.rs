// vim: tw=80
//! Optionally truncate a file, then write its own name into it at some offset

use std::{os::unix::ffi::OsStrExt, path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{fileops, parse_size};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Truncate-then-write test.  Sizes accept a b, k, m, or g suffix.
struct Cli {
    /// Truncate the file to this size before writing
    #[clap(short = 't', value_parser = parse_size)]
    trunc_to: Option<u64>,
    /// Offset at which to write
    #[clap(short = 'w', default_value = "0", value_parser = parse_size)]
    write_at: u64,
    file:     PathBuf,
}

impl Cli {
    fn main(self) -> Result<()> {
        let f = fileops::open_rw(&self.file)?;
        if let Some(len) = self.trunc_to {
            println!("Truncating {} to {}", self.file.display(), len);
            fileops::ftruncate(&f, len)?;
        }
        let data = self.file.as_os_str().as_bytes();
        println!("Writing {} bytes at {}", data.len(), self.write_at);
        fileops::pwrite_all(&f, data, self.write_at)
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
