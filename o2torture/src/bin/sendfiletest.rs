// vim: tw=80
//! Send a whole file over TCP with `sendfile(2)`

use std::{net::TcpStream, path::PathBuf, process::ExitCode};

use clap::{crate_version, Parser};
use nix::sys::sendfile::sendfile;
use o2torture::{exit, init_logging, Error, Result};
use o2torture_core::{fileops, SysContext};
use tracing::info;

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Connect to a TCP listener and sendfile a file to it
struct Cli {
    /// File to send
    src:  PathBuf,
    /// Receiving host
    host: String,
    #[clap(long, default_value_t = 8001)]
    port: u16,
}

/// Send all of `src` to `sock` in a single call
fn send(src: &std::fs::File, sock: &TcpStream) -> Result<usize> {
    let size = usize::try_from(fileops::i_size(src)?)
        .map_err(|_| Error::check("file too large to send"))?;
    let mut offset: libc::off_t = 0;
    let sent = sendfile(sock, src, Some(&mut offset), size).op("sendfile")?;
    if sent != size {
        return Err(Error::ShortWrite { offset: 0, wanted: size, got: sent });
    }
    Ok(sent)
}

impl Cli {
    fn main(self) -> Result<()> {
        let f = fileops::open_ro(&self.src)?;
        let sock = TcpStream::connect((self.host.as_str(), self.port))
            .op("connect")?;
        let sent = send(&f, &sock)?;
        info!(sent, host = %self.host, port = self.port, "sent file");
        Ok(())
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    exit(cli.main())
}

// LCOV_EXCL_STOP
