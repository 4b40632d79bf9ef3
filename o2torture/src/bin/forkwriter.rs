// vim: tw=80
//! Batches of writers that all create, truncate, and fill the same file.
//!
//! Each writer is a process of its own.  Each loop names a fresh file.  Run on
//! several nodes with the same base name to make the nodes fight over creating
//! it.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result};
use o2torture_core::{
    logline,
    racer::{race, Racer, Stop},
    SysContext,
};
use tracing::warn;

/// Lines each writer writes
const NUM_WRITES: usize = 100;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Repeatedly race writers that create the same file
struct Cli {
    /// Base name of the files to create
    file:     PathBuf,
    /// Number of batches of writers
    #[clap(default_value_t = 100)]
    loops:    u32,
    /// Writers in each batch
    #[clap(default_value_t = 2)]
    procs:    usize,
    /// Microseconds to sleep between writes
    #[clap(default_value_t = 50000)]
    sleep_us: u64,
}

/// Name of the file written during `iteration`
fn loop_file(base: &Path, iteration: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!("_{iteration:03}"));
    PathBuf::from(name)
}

fn open_trunc(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .op("open")
}

fn writer(path: &Path, iteration: u32, worker: usize, sleep: Duration)
    -> Result<()>
{
    println!("Pid {}, Loop {iteration}, Process {worker}, File {}",
             std::process::id(), path.display());
    let host = logline::hostname()?;
    let line = logline::pid_entry(&host, logline::now());
    let mut f = open_trunc(path)?;
    for _ in 0..NUM_WRITES {
        let written = f.write(line.as_bytes()).op("write")?;
        if written < line.len() {
            warn!(worker, written, "short write");
        }
        std::thread::sleep(sleep);
    }
    Ok(())
}

impl Cli {
    fn main(self) -> Result<()> {
        let sleep = Duration::from_micros(self.sleep_us);
        for i in 0..self.loops {
            let path = loop_file(&self.file, i);
            let racers = (0..self.procs).map(|w| {
                let path = &path;
                Racer::new(format!("writer {w}"), move |_: &Stop| {
                    writer(path, i, w, sleep)
                })
            }).collect();
            race(None, racers)?;
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
