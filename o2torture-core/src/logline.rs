// vim: tw=80
//! Human-readable log entries, as written by the log-writing programs

use time::{macros::format_description, OffsetDateTime};

use crate::types::*;

/// This machine's host name
pub fn hostname() -> Result<String> {
    let h = nix::unistd::gethostname().op("gethostname")?;
    Ok(h.to_string_lossy().into_owned())
}

/// The current local time, or UTC if the local offset can't be determined.
///
/// `time` refuses to look up the local offset once a process has more than one
/// thread.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Format a timestamp like `ctime(3)`, minus the trailing newline
pub fn ctime(t: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    );
    // Only fails for formats that need components a datetime lacks
    t.format(&fmt).unwrap_or_else(|_| t.unix_timestamp().to_string())
}

/// A line from one of several concurrent writer processes
pub fn pid_entry(host: &str, t: OffsetDateTime) -> String {
    format!("{} {}: This is a log entry for pid {}.\n", host, ctime(t),
            std::process::id())
}

/// A line from a lone writer, tagged with the program name
pub fn entry(host: &str, t: OffsetDateTime, prog: &str) -> String {
    format!("{} {} {}: This is a log entry.\n", host, ctime(t), prog)
}

// LCOV_EXCL_STOP
