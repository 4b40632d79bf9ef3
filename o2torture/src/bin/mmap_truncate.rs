// vim: tw=80
//! Race stores through a shared mapping against truncates of the mapped file.
//!
//! The store hits the last byte of a two-cluster file while another racer
//! process repeatedly chops the file down to one cluster and grows it back.
//! Stores that land while the file is short raise `SIGBUS`, which is
//! tolerated.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Error, Result, SeedArg};
use o2torture_core::{
    fileops,
    mmap::{sigbus_count, tolerate_sigbus, MappedFile},
    racer::{race, Racer, Stop},
    seeded_rng,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::info;

/// Longest pause between stores
const MAX_STORE_SLEEP_US: u64 = 50;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Stress end-of-file handling by racing truncates against stores to a shared
/// writable mapping
struct Cli {
    /// log2 of the file system's cluster size
    #[clap(short = 'c', default_value_t = 12,
           value_parser = clap::value_parser!(u32).range(9..=20))]
    csize_bits: u32,
    /// How long to run, in seconds
    #[clap(short = 's', default_value_t = 300)]
    seconds:    u64,
    #[clap(flatten)]
    seed:       SeedArg,
    /// File to create.  It is truncated if it already exists.
    file:       PathBuf,
}

impl Cli {
    fn main(self) -> Result<()> {
        let clustersize = 1u64 << self.csize_bits;
        let file_size = 2 * clustersize;
        let (seed, mut rng) = seeded_rng(self.seed.seed);

        tolerate_sigbus()?;
        let f = fileops::create_trunc(&self.file)?;
        fileops::ftruncate(&f, file_size)?;
        let map = MappedFile::shared_rw(&f, file_size as usize)?;
        let tf = fileops::open_rw(&self.file)?;

        let store_rng = XorShiftRng::seed_from_u64(rng.gen());
        let storer = Racer::new("mmap", move |stop: &Stop| {
            let mut rng = store_rng;
            let mut stores = 0u64;
            loop {
                let us = rng.gen_range(0..MAX_STORE_SLEEP_US);
                if !stop.sleep(Duration::from_micros(us)) {
                    break;
                }
                map.store(map.len() - 1, b'a');
                stores += 1;
            }
            info!(stores, "mmap racer done");
            // The handler counts in this process only
            println!("Caught {} SIGBUS", sigbus_count());
            Ok(())
        });
        let truncator = Racer::new("truncate", move |stop: &Stop| {
            let mut cycles = 0u64;
            let r = (|| {
                while !stop.is_set() {
                    fileops::ftruncate(&tf, clustersize)?;
                    fileops::ftruncate(&tf, file_size)?;
                    cycles += 1;
                }
                Ok::<(), Error>(())
            })();
            if r.is_err() {
                // Don't leave the mmap racer stuck faulting on a short file
                let _ = fileops::ftruncate(&tf, file_size);
            }
            info!(cycles, "truncate racer done");
            r
        });

        println!("Running for {} seconds with seed {seed}", self.seconds);
        race(Some(Duration::from_secs(self.seconds)), vec![storer, truncator])?;
        let size = fileops::i_size(&f)?;
        if size != file_size {
            return Err(Error::check(format_args!(
                "file size is {size}, expected {file_size}")));
        }
        println!("All tests passed.");
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
