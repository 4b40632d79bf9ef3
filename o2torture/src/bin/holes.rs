// vim: tw=80
//! Fill a file with random writes or punch random holes in it, logging every
//! operation, then verify the file against the log.

use std::{fs::File, path::PathBuf, process::ExitCode};

use clap::{crate_version, Args, Parser, Subcommand};
use o2torture::{exit, init_logging, parse_nonzero_size, Error, Result,
                SeedArg};
use o2torture_core::{
    fileops,
    hole_map::ExtentMap,
    mmap::MappedFile,
    resv::{self, Method},
    seeded_rng,
    write_log::{LogReader, LogWriter, WriteUnit, MAX_WRITE_SIZE,
                RAND_CHAR_SPAN, RAND_CHAR_START},
};
use rand::Rng;
use rand_xorshift::XorShiftRng;
use tracing::info;

/// Iterations to run when neither -i nor -r is given
const DEFAULT_ITERATIONS: u64 = 1000;

/// Options shared by fill and punch
#[derive(Args, Clone, Debug)]
struct Common {
    /// Flush and fsync the log after every write unit
    #[clap(short = 'f')]
    flush:      bool,
    /// Reserve the whole file as unwritten extents before truncating it out
    #[clap(short = 'u')]
    unwritten:  bool,
    /// How to reserve space and punch holes
    #[clap(long, default_value = "ocfs2")]
    method:     Method,
    /// Number of write units.  With -r, defaults to the whole replay log.
    #[clap(short = 'i')]
    iterations: Option<u64>,
    /// Write the log here instead of to stdout
    #[clap(short = 'o')]
    log:        Option<PathBuf>,
    /// Take write units from this log instead of generating them
    #[clap(short = 'r')]
    replay:     Option<PathBuf>,
    #[clap(flatten)]
    seed:       SeedArg,
    file:       PathBuf,
    /// File size.  Accepts a k, m, or g suffix.
    #[clap(value_parser = parse_nonzero_size)]
    size:       u64,
}

/// Where write units come from
enum Source {
    Random(XorShiftRng),
    Replay(LogReader<std::io::BufReader<File>>),
}

impl Source {
    fn next(&mut self, file_size: u64) -> Option<Result<WriteUnit>> {
        match self {
            Source::Random(rng) => Some(Ok(WriteUnit::random(rng, file_size))),
            Source::Replay(r) => r.next(),
        }
    }
}

/// Everything a fill or punch run needs
struct Run {
    f:       File,
    map:     Option<MappedFile>,
    log:     LogWriter,
    source:  Source,
    method:  Method,
    size:    u64,
    iters:   u64,
}

impl Common {
    /// Create the file, log, and unit source
    fn prepare(&self, use_mmap: bool) -> Result<Run> {
        let f = fileops::create_trunc(&self.file)?;
        if self.unwritten {
            resv::reserve(&f, self.method, 0, self.size)?;
        }
        fileops::ftruncate(&f, self.size)?;
        let map = if use_mmap {
            let len = usize::try_from(self.size)
                .map_err(|_| Error::check("file too large to map"))?;
            Some(MappedFile::shared_rw(&f, len)?)
        } else {
            None
        };
        let log = match &self.log {
            Some(p) => LogWriter::create(p, self.flush)?,
            None => LogWriter::stdout(self.flush)
        };
        let (source, default_iters) = match &self.replay {
            Some(p) => (Source::Replay(LogReader::open(p)?), u64::MAX),
            None => {
                let (_, rng) = seeded_rng(self.seed.seed);
                (Source::Random(rng), DEFAULT_ITERATIONS)
            }
        };
        Ok(Run {
            f,
            map,
            log,
            source,
            method: self.method,
            size: self.size,
            iters: self.iterations.unwrap_or(default_iters)
        })
    }
}

impl Run {
    /// Log a unit, then apply it to the file
    fn apply(&mut self, wu: &WriteUnit) -> Result<()> {
        self.log.append(wu)?;
        if wu.is_hole() {
            return resv::punch(&self.f, self.method, wu.offset,
                               u64::from(wu.len));
        }
        match &self.map {
            Some(m) => {
                if wu.end() > self.size {
                    return Err(Error::check(format_args!(
                        "write unit {wu} lies beyond the mapping")));
                }
                m.fill(wu.offset as usize, wu.len as usize, wu.ch);
                Ok(())
            }
            None => fileops::pwrite_all(&self.f, &wu.data(), wu.offset)
        }
    }

    /// Fill the whole file front to back
    fn populate(&mut self) -> Result<()> {
        let mut start = 0;
        while start < self.size {
            let wu = match &mut self.source {
                Source::Random(rng) => {
                    let ch = RAND_CHAR_START + rng.gen_range(0..RAND_CHAR_SPAN);
                    let len = u64::from(rng.gen_range(1..=MAX_WRITE_SIZE))
                        .min(self.size - start) as u32;
                    WriteUnit::new(ch, start, len)
                }
                Source::Replay(r) => match r.next() {
                    Some(wu) => wu?,
                    None => return Ok(())
                }
            };
            self.apply(&wu)?;
            start = wu.end();
        }
        Ok(())
    }

    fn finish(mut self, what: &str, units: u64) -> Result<()> {
        self.log.flush()?;
        drop(self.map);
        fileops::fsync(&self.f)?;
        info!(units, "{what} complete");
        Ok(())
    }
}

#[derive(Parser, Clone, Debug)]
/// Fill a sparse file with random writes
struct Fill {
    /// Write through a shared mapping instead of pwrite
    #[clap(short = 'm')]
    mmap:   bool,
    #[clap(flatten)]
    common: Common,
}

impl Fill {
    fn main(self) -> Result<()> {
        let mut run = self.common.prepare(self.mmap)?;
        let mut units = 0;
        while units < run.iters {
            let Some(wu) = run.source.next(run.size) else { break };
            run.apply(&wu?)?;
            units += 1;
        }
        run.finish("fill", units)
    }
}

#[derive(Parser, Clone, Debug)]
/// Fill a file front to back, then punch random holes in it
struct Punch {
    #[clap(flatten)]
    common: Common,
}

impl Punch {
    fn main(self) -> Result<()> {
        let mut run = self.common.prepare(false)?;
        run.populate()?;
        let mut units = 0;
        while units < run.iters {
            let Some(wu) = run.source.next(run.size) else { break };
            let wu = wu?;
            run.apply(&WriteUnit::hole(wu.offset, wu.len))?;
            units += 1;
        }
        run.finish("punch", units)
    }
}

#[derive(Parser, Clone, Debug)]
/// Verify a file against the log of fill or punch
struct Verify {
    /// Print each extent as it is checked
    #[clap(short = 'v')]
    verbose: bool,
    log:     PathBuf,
    file:    PathBuf,
}

impl Verify {
    fn main(self) -> Result<()> {
        let f = fileops::open_ro(&self.file)?;
        let mut map = ExtentMap::new(fileops::i_size(&f)?);
        for wu in LogReader::open(&self.log)? {
            map.insert(&wu?);
        }
        map.verify(&f, self.verbose)?;
        println!("Verified {} extents of {}", map.len(), self.file.display());
        Ok(())
    }
}

#[derive(Subcommand, Clone, Debug)]
enum SubCommand {
    Fill(Fill),
    Punch(Punch),
    Verify(Verify),
}

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Fill, punch, and verify holes
struct Cli {
    #[clap(subcommand)]
    cmd: SubCommand,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(match cli.cmd {
        SubCommand::Fill(fill) => fill.main(),
        SubCommand::Punch(punch) => punch.main(),
        SubCommand::Verify(verify) => verify.main(),
    })
}

// LCOV_EXCL_STOP
