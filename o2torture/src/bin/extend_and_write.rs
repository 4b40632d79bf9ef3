// vim: tw=80
//! Two racer processes extend one file through a shared `O_APPEND` file
//! description.
//!
//! Every append must land whole, so the file ends up as a sequence of uniform
//! blocks, half of them `A` and half `B`.

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Write},
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
    process::ExitCode,
};

use clap::{crate_version, Args, Parser, Subcommand};
use o2torture::{exit, init_logging, Error, Result};
use o2torture_core::{
    fileops,
    racer::{race, Racer, Stop},
    SysContext,
};
use tracing::{info, warn};

#[derive(Args, Clone, Debug)]
struct Common {
    /// File to extend or verify
    #[clap(short = 'f', default_value = "testfile")]
    file: PathBuf,
    /// Bytes per append
    #[clap(short = 's', default_value_t = 1024,
           value_parser = clap::value_parser!(u32).range(1..))]
    size: u32,
    /// Appends per racer
    #[clap(short = 'n', default_value_t = 10240,
           value_parser = clap::value_parser!(u64).range(1..))]
    num:  u64,
}

impl Common {
    fn expected_size(&self) -> u64 {
        2 * u64::from(self.size) * self.num
    }
}

#[derive(Subcommand, Clone, Debug)]
enum SubCommand {
    /// Create the file and race two appenders against it
    Run(Common),
    /// Check a file left behind by `run`
    Verify(Common),
}

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Race two appenders on the same file, then check that no append was lost
/// or torn
struct Cli {
    #[clap(subcommand)]
    cmd: SubCommand,
}

fn appender<'a>(f: &'a File, ch: u8, c: &Common) -> Racer<'a> {
    let block = vec![ch; c.size as usize];
    let num = c.num;
    let name = char::from(ch).to_string();
    Racer::new(name, move |stop: &Stop| {
        let mut f = f;
        for i in 0..num {
            if stop.is_set() {
                break;
            }
            let written = f.write(&block).op("write")?;
            if written != block.len() {
                warn!(ch = %char::from(ch), written, i, "short write");
            }
            fileops::fsync(f)?;
        }
        info!(ch = %char::from(ch), "appender is exiting");
        Ok(())
    })
}

fn run(c: Common) -> Result<()> {
    println!("file will be {} bytes after this run", c.expected_size());
    let f = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .mode(0o644)
        .open(&c.file)
        .op("open")?;
    // Appending and truncating don't mix in OpenOptions
    fileops::ftruncate(&f, 0)?;
    race(None, vec![appender(&f, b'A', &c), appender(&f, b'B', &c)])
}

/// Read one block, returning how many bytes were available
fn read_block(f: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match f.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into())
        }
    }
    Ok(got)
}

fn verify(c: Common) -> Result<()> {
    println!("file should be {} bytes", c.expected_size());
    let mut f = fileops::open_ro(&c.file)?;
    let size = c.size as usize;
    let mut buf = vec![0u8; size];
    let (mut numas, mut numbs) = (0u64, 0u64);
    for i in 0..2 * c.num {
        let got = read_block(&mut f, &mut buf)?;
        if got != size {
            return Err(Error::check(format_args!(
                "File is too small, could only read {} bytes",
                i * size as u64 + got as u64)));
        }
        let ch = buf[0];
        if ch != b'A' && ch != b'B' {
            return Err(Error::check(format_args!(
                "Invalid data found, char {:?} encountered", char::from(ch))));
        }
        if let Some(pos) = buf.iter().position(|&b| b != ch) {
            return Err(Error::Corrupt {
                what: format!("block {i}"),
                offset: i * size as u64 + pos as u64,
                expected: ch,
                found: buf[pos],
                count: buf.iter().filter(|&&b| b != ch).count(),
            });
        }
        if ch == b'A' {
            numas += 1;
        } else {
            numbs += 1;
        }
    }
    let size = fileops::i_size(&f)?;
    if size != c.expected_size() {
        return Err(Error::check(format_args!(
            "File is too big, it has {size} bytes")));
    }
    if numas != c.num || numbs != c.num {
        return Err(Error::check(format_args!(
            "should have {} A's and {} B's but have {numas} A's and {numbs} B's",
            c.num, c.num)));
    }
    println!("File verification successful.");
    Ok(())
}

impl Cli {
    fn main(self) -> Result<()> {
        match self.cmd {
            SubCommand::Run(c) => run(c),
            SubCommand::Verify(c) => verify(c),
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
