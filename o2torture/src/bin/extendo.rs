// vim: tw=80
//! Grow a file by seeking past its end and writing a few bytes

use std::{
    fs::OpenOptions,
    io::{Seek, SeekFrom, Write},
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Error, Result};
use o2torture_core::{fileops, SysContext};

const RECORD: &[u8; 10] = b"123456789\0";

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Repeatedly reopen a file and write a record a fixed distance past its end
struct Cli {
    file:    PathBuf,
    /// Size of each gap, in KiB
    kb:      u64,
    /// Milliseconds to sleep after each write
    wait_ms: u64,
    /// Number of records to write
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    loops:   u64,
}

impl Cli {
    fn gap(&self) -> u64 {
        self.kb * 1024
    }

    fn main(self) -> Result<()> {
        let wait = Duration::from_millis(self.wait_ms);
        let gap = i64::try_from(self.gap())
            .map_err(|_| Error::sys("lseek", nix::errno::Errno::EINVAL))?;
        let mut opts = OpenOptions::new();
        opts.read(true).write(true).create(true).mode(0o666);
        let initial = fileops::i_size(&opts.open(&self.file).op("open")?)?;
        println!("seek to end at offset {initial}");
        for _ in 0..self.loops {
            let mut f = opts.open(&self.file).op("open")?;
            let off = f.seek(SeekFrom::End(gap)).op("lseek")?;
            f.write_all(RECORD).op("write")?;
            println!("write succeeded at offset {off}...  sleeping {} ms...",
                     self.wait_ms);
            std::thread::sleep(wait);
        }
        let expected = initial + self.loops * (self.gap() + RECORD.len() as u64);
        let size = fileops::i_size(&fileops::open_ro(&self.file)?)?;
        if size != expected {
            return Err(Error::check(format_args!(
                "file size is {size}, expected {expected}")));
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
