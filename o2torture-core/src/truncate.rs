// vim: tw=80
//! Truncate/extend boundary verification
//!
//! Fill a file with a cluster-sized pattern, truncate it to a random size,
//! extend it back out to a cluster boundary, and check that the reclaimed tail
//! of the last cluster reads as zeros.  The last cluster is checked twice: once
//! straight from the page cache, and again from stable storage after a sync.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rand::Rng;
use tracing::{debug, info};

use crate::{
    fileops,
    pattern::Pattern,
    types::*,
    util::roundup,
};

/// What a single truncate/extend step does to the file
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Plan {
    /// Size that the file is truncated to
    pub new_size:  u64,
    /// Cluster boundary that the file is then extended to, if `new_size` is
    /// unaligned
    pub extend_to: Option<u64>,
    clustersize:   u64,
}

impl Plan {
    pub fn new(new_size: u64, clustersize: u64) -> Self {
        let extend_to = (new_size % clustersize != 0)
            .then(|| roundup(new_size, clustersize));
        Plan{new_size, extend_to, clustersize}
    }

    /// The file size after both steps
    pub fn final_size(&self) -> u64 {
        self.extend_to.unwrap_or(self.new_size)
    }

    /// Index of the last cluster in the file, or `None` if it is empty.
    pub fn last_cluster(&self) -> Option<u64> {
        (self.final_size() / self.clustersize).checked_sub(1)
    }
}

/// Repeatedly verifies truncate/extend zeroing on one file
pub struct TruncateVerifier<R> {
    path:        PathBuf,
    clustersize: u64,
    clusters:    u64,
    pattern:     Pattern,
    rng:         R,
}

impl<R: Rng> TruncateVerifier<R> {
    /// # Arguments
    ///
    /// `path`          -   File to create, torture, and remove
    /// `clustersize`   -   Cluster size of the file system under test
    /// `clusters`      -   How many clusters to fill before truncating
    /// `rng`           -   Source of the pattern and truncation points
    pub fn new(path: &Path, clustersize: u64, clusters: u64, mut rng: R)
        -> Self
    {
        let pattern = Pattern::random(&mut rng, clustersize as usize);
        TruncateVerifier {
            path: path.to_owned(),
            clustersize,
            clusters,
            pattern,
            rng
        }
    }

    fn scratch_path(&self) -> PathBuf {
        let mut s = self.path.clone().into_os_string();
        s.push("-tmp-file");
        PathBuf::from(s)
    }

    /// Fill the file with the pattern.
    ///
    /// Every cluster is also written to an unlinked scratch file, in
    /// alternation with the target, so the target's extents are interleaved
    /// with someone else's.
    pub fn prep(&self) -> Result<()> {
        let f = fileops::create_trunc(&self.path)?;
        let scratch_path = self.scratch_path();
        let scratch = fileops::create_trunc(&scratch_path)?;
        fs::remove_file(&scratch_path).op("unlink")?;
        fileops::fill_with_pattern(&f, &self.pattern, self.clusters,
                                   Some(&scratch))
    }

    /// Truncate to `new_size`, then extend to the next cluster boundary.
    pub fn truncate_and_extend(&self, new_size: u64) -> Result<Plan> {
        let plan = Plan::new(new_size, self.clustersize);
        println!("Truncating {} to {}", self.path.display(), new_size);
        fileops::truncate_path(&self.path, new_size)?;
        if let Some(extend_to) = plan.extend_to {
            println!("Extend {} to {}", self.path.display(), extend_to);
            fileops::truncate_path(&self.path, extend_to)?;
        }
        Ok(plan)
    }

    /// Check the file's contents against what `plan` predicts.
    pub fn verify(&self, plan: &Plan) -> Result<()> {
        let cs = self.clustersize;
        let f = fileops::open_ro(&self.path)?;
        println!("Verifying {}", self.path.display());
        let size = fileops::i_size(&f)?;
        if size != plan.final_size() {
            return Err(Error::check(format_args!(
                "{} is {size} bytes long, expected {}",
                self.path.display(), plan.final_size())));
        }
        let Some(last_cluster) = plan.last_cluster() else {
            return Ok(());
        };
        let mut buf = vec![0u8; cs as usize];
        for i in 0..last_cluster {
            fileops::pread_exact(&f, &mut buf, i * cs)?;
            if let Some(m) = self.pattern.compare(&buf) {
                let what = format!("#{i} cluster corrupted on {}",
                                   self.path.display());
                return Err(m.into_error(what, i * cs));
            }
        }

        let last_pattern = self.pattern.truncated(plan.new_size);
        let last_ofs = last_cluster * cs;
        fileops::pread_exact(&f, &mut buf, last_ofs)?;
        if let Some(m) = last_pattern.compare(&buf) {
            let what = format!("pagecache didn't get zero'd on {}",
                               self.path.display());
            return Err(m.into_error(what, last_ofs));
        }

        fileops::fsync(&f)?;
        fileops::drop_cache(&f)?;
        fileops::pread_exact(&f, &mut buf, last_ofs)?;
        if let Some(m) = last_pattern.compare(&buf) {
            let what = format!("data on disk didn't get zero'd on {}",
                               self.path.display());
            return Err(m.into_error(what, last_ofs));
        }
        debug!(clusters = last_cluster + 1, "verified");
        Ok(())
    }

    /// One complete fill/truncate/extend/verify/unlink cycle, at a random
    /// truncation point.
    pub fn iteration(&mut self) -> Result<Plan> {
        let new_size = self.rng.gen_range(0..=self.clusters * self.clustersize);
        self.iteration_at(new_size)
    }

    /// One complete cycle at a chosen truncation point
    pub fn iteration_at(&mut self, new_size: u64) -> Result<Plan> {
        self.prep()?;
        let plan = self.truncate_and_extend(new_size)?;
        self.verify(&plan)?;
        fs::remove_file(&self.path).op("unlink")?;
        Ok(plan)
    }

    pub fn run(&mut self, iterations: u64) -> Result<()> {
        for i in 0..iterations {
            let plan = self.iteration()?;
            info!(iteration = i, new_size = plan.new_size,
                  extend_to = ?plan.extend_to, "iteration passed");
        }
        Ok(())
    }
}

// LCOV_EXCL_STOP
