// vim: tw=80
//! Defragment part of a file with OCFS2's online extent mover

use std::{path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Error, Result};
use o2torture_core::{
    defrag::{defragment, DefragRange},
    fileops,
    parse_size,
};
use tracing::info;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Defragment a file with OCFS2_IOC_MOVE_EXT
struct Cli {
    /// Where to start, in bytes
    #[clap(short = 's', default_value = "0", value_parser = parse_size)]
    start:     u64,
    /// How many bytes to defragment.  Defaults to the rest of the file.
    #[clap(short = 'l', value_parser = parse_size)]
    len:       Option<u64>,
    /// Distance in bytes beyond which extents get merged.  0 lets the file
    /// system decide.
    #[clap(short = 't', default_value = "0", value_parser = parse_size)]
    threshold: u64,
    file:      PathBuf,
}

impl Cli {
    fn main(self) -> Result<()> {
        let f = fileops::open_rw(&self.file)?;
        let len = match self.len {
            Some(len) => len,
            None => fileops::i_size(&f)?.checked_sub(self.start)
                .ok_or_else(|| Error::check(format_args!(
                    "start {} is beyond the end of {}", self.start,
                    self.file.display())))?
        };
        let range = DefragRange {
            start: self.start,
            len,
            threshold: self.threshold
        };
        let outcome = defragment(&f, range)?;
        info!(moved = outcome.moved_len, "defragmented");
        if !outcome.complete {
            eprintln!("defrag didn't get finished completely.");
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
