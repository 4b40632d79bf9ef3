// vim: tw=80
//! Process plumbing shared by the o2torture programs

use std::process::ExitCode;

use clap::Args;
pub use o2torture_core::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Send diagnostics to stderr, filtered by `RUST_LOG`.
///
/// Stdout belongs to each program's own output.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .pretty()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// The process exit status for a failure.
///
/// A failed system call exits with its errno.  Anything else exits with 1.
pub fn exit_status(e: &Error) -> u8 {
    u8::try_from(e.exit_code())
        .ok()
        .filter(|&c| c != 0)
        .unwrap_or(1)
}

/// Report a program's outcome and convert it to the process exit status.
pub fn exit(r: Result<()>) -> ExitCode {
    match r {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Options shared by every program that uses random numbers
#[derive(Args, Clone, Debug, Default)]
pub struct SeedArg {
    /// Seed for the random number generator.  A random seed is used if
    /// unset.
    #[clap(long, env = "O2TORTURE_SEED")]
    pub seed: Option<u64>,
}

/// Parse a byte count that must not be zero
pub fn parse_nonzero_size(s: &str) -> std::result::Result<u64, String> {
    match o2torture_core::parse_size(s)? {
        0 => Err("size must not be zero".to_owned()),
        n => Ok(n)
    }
}

// LCOV_EXCL_STOP
