// vim: tw=80
//! Append timestamped lines to a log with synchronous writes

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
use o2torture_core::{logline, SysContext};
use tracing::warn;

const PROG: &str = "logwriter";

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Periodically append a line to a log file, with O_SYNC
struct Cli {
    logfile:  PathBuf,
    /// Microseconds to sleep between writes
    #[clap(default_value_t = 1_000_000)]
    sleep_us: u64,
    /// Number of lines to write
    #[clap(default_value_t = 1_000_000)]
    count:    u64,
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .custom_flags(libc::O_SYNC)
        .mode(0o644)
        .open(path)
        .op("open")
}

impl Cli {
    fn main(self) -> Result<()> {
        println!("write {} times to file {} and sleep {} microseconds",
                 self.count, self.logfile.display(), self.sleep_us);
        let host = logline::hostname()?;
        let mut f = open_log(&self.logfile)?;
        let sleep = Duration::from_micros(self.sleep_us);
        for _ in 0..self.count {
            let line = logline::entry(&host, logline::now(), PROG);
            let written = f.write(line.as_bytes()).op("write")?;
            if written < line.len() {
                warn!(written, "short write");
            }
            print!("{line}");
            std::thread::sleep(sleep);
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
