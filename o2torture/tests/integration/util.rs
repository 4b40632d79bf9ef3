// vim: tw=80
use std::{env, path::PathBuf};

use assert_cmd::Command;
use rstest::fixture;
use tempfile::{Builder, TempDir};

pub type Harness = (PathBuf, TempDir);

/// Build a command for one of this package's programs
pub fn o2torture(name: &str) -> Command {
    let mut cmd = Command::cargo_bin(name).unwrap();
    // Keep runs reproducible unless the caller asks otherwise
    if env::var_os("O2TORTURE_SEED").is_none() {
        cmd.env("O2TORTURE_SEED", "42");
    }
    cmd
}

/// How many seconds to run a timed test for.
///
/// Defaults to `secs`, multiplied by `$O2TORTURE_SCALE` if set.
pub fn scaled(secs: u64) -> String {
    let scale = env::var("O2TORTURE_SCALE")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1);
    (secs * scale).to_string()
}

/// A scratch directory, and the path of a not-yet-created file within it
#[fixture]
pub fn harness() -> Harness {
    let tempdir = Builder::new()
        .prefix(concat!(module_path!(), "."))
        .tempdir()
        .unwrap();
    let filename = tempdir.path().join("testfile");
    (filename, tempdir)
}

/// Skip a test.
// Sure would be nice if the test harness knew about "skipped" tests as opposed
// to "passed" or "failed".
#[macro_export]
macro_rules! skip {
    ($($reason: expr),+) => {
        use ::std::io::{self, Write};

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle, $($reason),+).unwrap();
        return;
    }
}
