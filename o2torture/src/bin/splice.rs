// vim: tw=80
//! Move data between a file and a pipe with `splice(2)`

use std::{io, os::fd::AsFd, path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser, Subcommand};
use nix::fcntl::{splice, SpliceFFlags};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{fileops, SysContext};
use tracing::debug;

/// The most that a single invocation will move
const SPLICE_LEN: usize = 10_000_000;

#[derive(Subcommand, Clone, Debug)]
enum SubCommand {
    /// Splice from FILE to stdout, which must be a pipe
    Read {
        file: PathBuf,
    },
    /// Splice from stdin, which must be a pipe, into FILE
    Write {
        /// File to create.  It is truncated if it already exists.
        file: PathBuf,
    },
}

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Exercise splice(2) to and from a file
struct Cli {
    #[clap(subcommand)]
    cmd: SubCommand,
}

/// Splice once from `src` to `dst`, returning the number of bytes moved
fn splice_once<S: AsFd, D: AsFd>(src: S, dst: D) -> Result<usize> {
    let n = splice(src, None, dst, None, SPLICE_LEN, SpliceFFlags::empty())
        .op("splice")?;
    debug!(n, "spliced");
    Ok(n)
}

impl Cli {
    fn main(self) -> Result<()> {
        let n = match self.cmd {
            SubCommand::Read { file } => {
                let f = fileops::open_ro(&file)?;
                splice_once(&f, io::stdout())?
            }
            SubCommand::Write { file } => {
                let f = fileops::create_trunc(&file)?;
                splice_once(io::stdin(), &f)?
            }
        };
        eprintln!("spliced length = {n}");
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
