// vim: tw=80
//! Fragment a file system on purpose.
//!
//! Many processes each grow their own files one chunk at a time, so the
//! allocator interleaves their extents the way years of ordinary use would.
//! Every chunk written is logged, so `verify_file` can check each file after
//! `defrager` has moved its data around.

use std::{
    fs::DirBuilder,
    os::unix::fs::DirBuilderExt,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, parse_nonzero_size, Result, SeedArg};
use o2torture_core::{
    chunk::{write_file, MIN_CHUNK_SIZE},
    logline,
    racer::{race, Racer, Stop},
    seeded_rng,
    SysContext,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::info;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Write many files from many processes at once, logging every chunk
struct Cli {
    /// Files written by each process
    #[clap(short = 'n', default_value_t = 1000)]
    num_files:     u64,
    /// Number of writer processes
    #[clap(short = 'm', default_value_t = 10,
           value_parser = clap::value_parser!(u32).range(1..))]
    num_processes: u32,
    /// Size of each file
    #[clap(short = 'l', default_value = "1m", value_parser = parse_nonzero_size)]
    file_size:     u64,
    /// Bytes written at a time
    #[clap(short = 'k', default_value_t = 32768,
           value_parser = clap::value_parser!(u32)
               .range(i64::from(MIN_CHUNK_SIZE)..))]
    chunk_size:    u32,
    /// Directory for the write logs
    #[clap(short = 'o')]
    log_place:     PathBuf,
    /// Directory for the files
    #[clap(short = 'w')]
    work_place:    PathBuf,
    /// Fill each file's chunks in random order
    #[clap(short = 'r')]
    random:        bool,
    /// Report every chunk written
    #[clap(short = 'v')]
    verbose:       bool,
    #[clap(flatten)]
    seed:          SeedArg,
}

/// Name of a writer's own subdirectory
fn process_dir(parent: &Path, host: &str) -> PathBuf {
    parent.join(format!("{host}-{}", std::process::id()))
}

fn mkdir(path: &Path) -> Result<()> {
    DirBuilder::new()
        .mode(0o755)
        .create(path)
        .op("mkdir")
}

impl Cli {
    /// One writer process's work
    fn write_files(&self, host: &str, mut rng: XorShiftRng) -> Result<()> {
        let dir = process_dir(&self.work_place, host);
        let log_dir = process_dir(&self.log_place, host);
        mkdir(&dir)?;
        mkdir(&log_dir)?;
        for j in 0..self.num_files {
            write_file(&mut rng,
                       &dir.join(format!("file-{j}")),
                       &log_dir.join(format!("logfile-{j}")),
                       self.file_size,
                       self.chunk_size,
                       self.random,
                       self.verbose)?;
        }
        info!(files = self.num_files, dir = %dir.display(), "writer done");
        Ok(())
    }

    fn main(self) -> Result<()> {
        let host = logline::hostname()?;
        let (seed, mut rng) = seeded_rng(self.seed.seed);
        println!("{} processes writing {} files of {} bytes each, seed {seed}",
                 self.num_processes, self.num_files, self.file_size);
        let racers = (0..self.num_processes).map(|i| {
            let rng = XorShiftRng::seed_from_u64(rng.gen());
            let (cli, host) = (&self, &host);
            Racer::new(format!("writer {i}"), move |_: &Stop| {
                cli.write_files(host, rng)
            })
        }).collect();
        race(None, racers)
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
