// vim: tw=80
//! Verify that truncating a file and extending it back out zeroes the
//! reclaimed part of its last cluster, in the page cache and on disk.

use std::{path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use o2torture::{exit, init_logging, Result, SeedArg};
use o2torture_core::{seeded_rng, superblock::Superblock,
                     truncate::TruncateVerifier};

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Truncate/extend boundary verifier
struct Cli {
    /// File to create, torture, and remove
    #[clap(short = 'f', long = "file")]
    file:         PathBuf,
    /// Number of fill/truncate/verify cycles
    #[clap(short = 'i', long, default_value_t = 1)]
    iterations:   u64,
    /// Number of clusters to fill before truncating
    #[clap(short = 'c', long, default_value_t = 100,
           value_parser = clap::value_parser!(u64).range(1..))]
    clusters:     u64,
    /// OCFS2 device holding the file.  Its superblock supplies the cluster
    /// size.
    #[clap(short = 'd', long, conflicts_with = "cluster_size")]
    device:       Option<PathBuf>,
    /// Cluster size in bytes, when no device is given
    #[clap(short = 'b', long, default_value_t = 32768,
           value_parser = clap::value_parser!(u64).range(1..))]
    cluster_size: u64,
    #[clap(flatten)]
    seed:         SeedArg,
}

impl Cli {
    fn main(self) -> Result<()> {
        let clustersize = match &self.device {
            Some(dev) => {
                let sb = Superblock::open(dev)?;
                println!("{}: label {:?}, uuid {}, cluster size {}, block size \
                          {}", dev.display(), sb.label, sb.uuid_string(),
                         sb.clustersize(), sb.blocksize());
                sb.clustersize()
            }
            None => self.cluster_size
        };
        let (_, rng) = seeded_rng(self.seed.seed);
        let mut v = TruncateVerifier::new(&self.file, clustersize,
                                          self.clusters, rng);
        v.run(self.iterations)?;
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
