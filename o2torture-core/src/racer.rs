// vim: tw=80
//! Run several workers against the same files at once.
//!
//! Each worker ("racer") runs in its own child process, forked from the
//! caller.  The racers do not coordinate with each other beyond a shared stop
//! flag.  Any ordering between them is up to the file system under test.

use std::{
    ffi::c_void,
    io::{self, Write},
    mem,
    num::NonZeroUsize,
    ops::Deref,
    panic::{self, AssertUnwindSafe},
    ptr::NonNull,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::{
        mman::{mmap_anonymous, munmap, MapFlags, ProtFlags},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::{fork, ForkResult, Pid},
};
use tracing::{debug, error, info};

use crate::types::*;

/// How often the supervisor checks the deadline and its children
const TICK: Duration = Duration::from_millis(10);

/// Exit status of a racer that panicked
const PANIC_STATUS: i32 = 101;

/// Tells racers when to quit
#[derive(Debug, Default)]
pub struct Stop(AtomicBool);

impl Stop {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed)
    }

    /// Sleep for `d`, waking early if the flag gets set.
    ///
    /// Returns `true` if the racer should keep going.
    pub fn sleep(&self, d: Duration) -> bool {
        let deadline = Instant::now() + d;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(TICK));
        }
    }
}

/// A [`Stop`] in anonymous shared memory, so it stays shared across `fork`
struct SharedStop(NonNull<c_void>);

impl SharedStop {
    fn new() -> Result<Self> {
        let len = NonZeroUsize::new(mem::size_of::<Stop>())
            .ok_or(Error::sys("mmap", Errno::EINVAL))?;
        // Safe because we map fresh memory at an address of the kernel's
        // choosing.
        let ptr = unsafe {
            mmap_anonymous(None, len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED)
        }.op("mmap")?;
        Ok(SharedStop(ptr))
    }
}

impl Deref for SharedStop {
    type Target = Stop;

    fn deref(&self) -> &Stop {
        // Safe because the mapping is zero-filled, and all zeros is a valid
        // unset Stop.  It lives until self is dropped.
        unsafe { self.0.cast::<Stop>().as_ref() }
    }
}

impl Drop for SharedStop {
    fn drop(&mut self) {
        // Safe because no references into the mapping outlive self
        if let Err(e) = unsafe { munmap(self.0, mem::size_of::<Stop>()) } {
            error!("munmap: {e}");
        }
    }
}

/// One named worker
pub struct Racer<'a> {
    name: String,
    f:    Box<dyn FnOnce(&Stop) -> Result<()> + 'a>,
}

impl<'a> Racer<'a> {
    pub fn new<S, F>(name: S, f: F) -> Self
        where S: Into<String>,
              F: FnOnce(&Stop) -> Result<()> + 'a
    {
        Racer{name: name.into(), f: Box::new(f)}
    }
}

/// The body of a racer's child process.  Never returns.
fn run_child(racer: Racer<'_>, stop: &Stop) -> ! {
    let Racer{name, f} = racer;
    let status = match panic::catch_unwind(AssertUnwindSafe(|| f(stop))) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error!(racer = %name, "{e}");
            match e.exit_code() {
                c @ 1..=255 => c,
                _ => 1
            }
        }
        Err(_) => PANIC_STATUS
    };
    let _ = io::stdout().flush();
    // Safe because the child owns nothing that must be cleaned up, and it must
    // not run the parent's exit handlers.
    unsafe { libc::_exit(status) }
}

/// Translate a child's fate into the racer's result
fn child_result(name: &str, ws: WaitStatus) -> Option<Result<()>> {
    match ws {
        WaitStatus::Exited(_, 0) => Some(Ok(())),
        WaitStatus::Exited(_, status) => Some(Err(Error::Racer {
            name: name.to_owned(),
            status
        })),
        WaitStatus::Signaled(_, sig, _) => Some(Err(Error::check(format_args!(
            "racer {name} was killed by {sig:?}")))),
        _ => None
    }
}

/// Run all racers concurrently, each in its own child process.
///
/// With a `deadline`, the racers are told to stop once it passes.  Without
/// one, they run until each returns by itself.  Either way, the first racer to
/// fail stops all the others, and its error is returned.  A racer that fails
/// with a system call error exits with that `errno`, which becomes the
/// `status` of the returned [`Error::Racer`].
///
/// Racers should be started before the caller spawns any threads of its own.
pub fn race(deadline: Option<Duration>, racers: Vec<Racer<'_>>) -> Result<()> {
    let stop = SharedStop::new()?;
    let start = Instant::now();
    let mut first_error = None;
    // Anything still buffered would otherwise be printed by every child
    io::stdout().flush().op("write")?;

    let mut children: Vec<(Pid, String)> = Vec::with_capacity(racers.len());
    for racer in racers {
        // Safe because the child only runs the racer and then _exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => run_child(racer, &stop),
            Ok(ForkResult::Parent{child}) => {
                debug!(racer = %racer.name, %child, "started racer");
                children.push((child, racer.name));
            }
            Err(e) => {
                stop.set();
                first_error = Some(Error::sys("fork", e));
                break;
            }
        }
    }

    while !children.is_empty() {
        if deadline.is_some_and(|d| start.elapsed() >= d) {
            stop.set();
        }
        let mut reaped = false;
        let mut i = 0;
        while i < children.len() {
            let (pid, ref name) = children[i];
            let r = match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(ws) => child_result(name, ws),
                Err(Errno::EINTR) => None,
                Err(e) => Some(Err(Error::sys("waitpid", e)))
            };
            match r {
                None => i += 1,
                Some(r) => {
                    reaped = true;
                    if let Err(e) = r {
                        error!(racer = %name, "{e}");
                        stop.set();
                        first_error.get_or_insert(e);
                    }
                    children.swap_remove(i);
                }
            }
        }
        if !reaped {
            thread::sleep(TICK);
        }
    }
    info!(elapsed = ?start.elapsed(), "race finished");
    first_error.map_or(Ok(()), Err)
}

// LCOV_EXCL_STOP
