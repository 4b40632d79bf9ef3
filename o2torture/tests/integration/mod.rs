// vim: tw=80
//! Tests that run the programs themselves, against a scratch directory on
//! whatever file system hosts the temporary directory.

mod util;

mod check_file_size_limits;
mod defrag;
mod extend_and_write;
mod extendo;
mod forkwriter;
mod logwriter;
mod mmap_test;
mod mmap_truncate;
mod sendfiletest;
mod splice;
mod truncate;
mod ttest;
mod verify_truncate;
mod write_torture;
