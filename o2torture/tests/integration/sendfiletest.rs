use std::{io::Read, net::TcpListener, thread};

use assert_cmd::prelude::*;
use rstest::rstest;

use super::util::*;

#[rstest]
fn sends_whole_file(harness: Harness) {
    let (filename, _tempdir) = harness;
    let data = (0..300_000u32).map(|i| (i % 253) as u8).collect::<Vec<_>>();
    std::fs::write(&filename, &data).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let receiver = thread::spawn(move || {
        let (mut s, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        s.read_to_end(&mut buf).unwrap();
        buf
    });
    o2torture("sendfiletest")
        .arg(&filename)
        .arg("127.0.0.1")
        .args(["--port", &port.to_string()])
        .assert()
        .success();
    assert!(receiver.join().unwrap() == data);
}

#[rstest]
fn connection_refused(harness: Harness) {
    let (filename, _tempdir) = harness;
    std::fs::write(&filename, b"x").unwrap();
    // Grab a free port, then close it again
    let port = TcpListener::bind("127.0.0.1:0").unwrap()
        .local_addr().unwrap().port();
    o2torture("sendfiletest")
        .arg(&filename)
        .arg("127.0.0.1")
        .args(["--port", &port.to_string()])
        .assert()
        .failure()
        .code(libc::ECONNREFUSED);
}
