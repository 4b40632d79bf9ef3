// vim: tw=80
//! Six racer processes hammer one file with appends, overwrites, writes past
//! and across EOF, and truncates in both directions.

use std::{
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result, SeedArg};
use o2torture_core::{
    fileops,
    racer::{race, Racer, Stop},
    seeded_rng,
    SysContext,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::{info, warn};

/// Size of every write, and the upper bound of random append sizes
const BLKLEN: usize = 8102;
const WRITER_SLEEP_US: u64 = 100_000;
const TRUNCATOR_SLEEP_US: u64 = 400_000;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Race writers and truncators against one file
struct Cli {
    /// How long to run, in seconds
    #[clap(short = 's', default_value_t = 300)]
    seconds: u64,
    #[clap(flatten)]
    seed:    SeedArg,
    path:    PathBuf,
}

/// What each racer does on every step
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Append,
    InPlace,
    PastSize,
    TruncateDown,
    TruncateUp,
    Straddle,
}

impl Kind {
    const ALL: [Kind; 6] = [Kind::Append, Kind::InPlace, Kind::PastSize,
        Kind::TruncateDown, Kind::TruncateUp, Kind::Straddle];

    fn name(self) -> &'static str {
        match self {
            Kind::Append => "append",
            Kind::InPlace => "in-place",
            Kind::PastSize => "past-size",
            Kind::TruncateDown => "truncate-down",
            Kind::TruncateUp => "truncate-up",
            Kind::Straddle => "straddle",
        }
    }

    /// Fill byte for writers
    fn fill(self) -> u8 {
        match self {
            Kind::Append => b'a',
            Kind::InPlace => b'i',
            Kind::PastSize => b'p',
            Kind::Straddle => b's',
            Kind::TruncateDown | Kind::TruncateUp => 0,
        }
    }

    fn open(self, path: &Path) -> Result<File> {
        let mut oo = OpenOptions::new();
        match self {
            Kind::Append => oo.read(true).append(true),
            Kind::Straddle => oo.write(true),
            _ => oo.read(true).write(true),
        };
        oo.open(path).op("open")
    }

    fn max_sleep(self) -> Duration {
        match self {
            Kind::TruncateDown | Kind::TruncateUp =>
                Duration::from_micros(TRUNCATOR_SLEEP_US),
            _ => Duration::from_micros(WRITER_SLEEP_US),
        }
    }
}

/// One racer's private state
struct Worker {
    kind:  Kind,
    f:     File,
    rng:   XorShiftRng,
    block: Vec<u8>,
}

impl Worker {
    fn logprint(&self, what: &str, value: u64) {
        println!("[{}]: {what}\t: {value}", self.kind.name());
    }

    fn write_block(&mut self, len: usize) -> Result<()> {
        let written = self.f.write(&self.block[..len]).op("write")?;
        if written < len {
            warn!(racer = self.kind.name(), written, len, "short write");
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        match self.kind {
            Kind::Append => {
                let len = self.rng.gen_range(1..=BLKLEN);
                self.logprint("append write len", len as u64);
                self.write_block(len)
            }
            Kind::InPlace => {
                let size = fileops::i_size(&self.f)?;
                let off = if size > BLKLEN as u64 {
                    self.rng.gen_range(0..size - BLKLEN as u64)
                } else {
                    0
                };
                self.logprint("write in place offset", off);
                self.f.seek(SeekFrom::Start(off)).op("lseek")?;
                self.write_block(BLKLEN)
            }
            Kind::PastSize => {
                let off = self.rng.gen_range(0..3 * BLKLEN as i64);
                self.logprint("write past i_size offset", off as u64);
                self.f.seek(SeekFrom::End(off)).op("lseek")?;
                self.write_block(BLKLEN)
            }
            Kind::TruncateDown | Kind::TruncateUp => {
                let size = fileops::i_size(&self.f)?;
                let mut len = self.rng.gen_range(0..=size / 3);
                let where_ = if self.kind == Kind::TruncateUp {
                    len += size;
                    "truncate up to size"
                } else {
                    "truncate down to size"
                };
                if size > 0 && len > 0 {
                    self.logprint(where_, len);
                    fileops::ftruncate(&self.f, len)?;
                }
                Ok(())
            }
            Kind::Straddle => {
                let size = fileops::i_size(&self.f)?;
                let mut off = size;
                if off >= BLKLEN as u64 {
                    off -= self.rng.gen_range(0..BLKLEN as u64);
                }
                self.logprint("write straddling offset", off);
                self.f.seek(SeekFrom::Start(off)).op("lseek")?;
                self.write_block(BLKLEN)
            }
        }
    }

    fn run(mut self, stop: &Stop) -> Result<()> {
        let mut steps = 0u64;
        while !stop.is_set() {
            self.step()?;
            steps += 1;
            let max = self.kind.max_sleep().as_micros() as u64;
            let d = Duration::from_micros(self.rng.gen_range(0..max));
            if !stop.sleep(d) {
                break;
            }
        }
        info!(racer = self.kind.name(), steps, "racer done");
        Ok(())
    }
}

impl Cli {
    fn main(self) -> Result<()> {
        drop(fileops::create_trunc(&self.path)?);
        let (_, mut rng) = seeded_rng(self.seed.seed);
        let racers = Kind::ALL.iter()
            .map(|&kind| -> Result<Racer<'static>> {
                let w = Worker {
                    kind,
                    f: kind.open(&self.path)?,
                    rng: XorShiftRng::seed_from_u64(rng.gen()),
                    block: vec![kind.fill(); BLKLEN],
                };
                Ok(Racer::new(kind.name(), move |stop: &Stop| w.run(stop)))
            }).collect::<Result<Vec<_>>>()?;
        race(Some(Duration::from_secs(self.seconds)), racers)?;
        println!("Final size of {}: {}", self.path.display(),
                 fileops::i_size(&fileops::open_ro(&self.path)?)?);
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
