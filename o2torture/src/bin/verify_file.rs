// vim: tw=80
//! Check a file written by `frager` against its write log

use std::{io::BufReader, path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, parse_nonzero_size, Result};
use o2torture_core::{
    chunk::{read_log, ChunkVerifier, MIN_CHUNK_SIZE},
    fileops,
};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Verify a chunked file against the log of its writes
struct Cli {
    /// File to verify
    #[clap(short = 'f')]
    file:      PathBuf,
    /// The file's write log
    #[clap(short = 'o')]
    log:       PathBuf,
    /// Bytes to verify, from the start of the file
    #[clap(short = 'l', value_parser = parse_nonzero_size)]
    filesize:  u64,
    /// Chunk size the file was written with
    #[clap(short = 'k', value_parser = clap::value_parser!(u32)
               .range(i64::from(MIN_CHUNK_SIZE)..))]
    chunksize: u32,
    /// Report every chunk verified
    #[clap(short = 'v')]
    verbose:   bool,
}

impl Cli {
    fn main(self) -> Result<()> {
        let mut v = ChunkVerifier::new(self.filesize, self.chunksize);
        let log = BufReader::new(fileops::open_ro(&self.log)?);
        for c in read_log(log) {
            v.record(c?)?;
        }
        let f = fileops::open_ro(&self.file)?;
        v.verify(&f, self.verbose)?;
        println!("Verified {} chunks of {}", v.len(), self.file.display());
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
