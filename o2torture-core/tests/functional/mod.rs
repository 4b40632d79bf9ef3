// vim: tw=80
//! Tests of the library against real files in a scratch directory

mod holes;
mod racer;
mod truncate;

use std::path::PathBuf;

use tempfile::{Builder, TempDir};

/// A scratch directory, and the path of a not-yet-created file within it
fn scratch(prefix: &str) -> (PathBuf, TempDir) {
    let tempdir = Builder::new()
        .prefix(prefix)
        .tempdir()
        .unwrap();
    let path = tempdir.path().join("testfile");
    (path, tempdir)
}
