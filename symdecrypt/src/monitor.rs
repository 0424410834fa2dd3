//! Diagnostics on termination signals.
//!
//! Decryption may hang, for instance when no ciphertext ever arrives
//! on stdin.  The monitor waits for SIGINT, SIGTERM, SIGHUP and
//! SIGPIPE on its own thread.  When one arrives, it writes out the
//! CPU profile, describes every thread of the process on stderr, and
//! exits with status 1.  It never returns control to the main thread.

use std::backtrace::Backtrace;
use std::io::{self, Write};
use std::path::Path;
use std::thread;

use anyhow::Context;

use sequoia_openpgp as openpgp;
use openpgp::Result;

use crate::profile::CpuProfile;

/// Exit status after a signal.
const EXIT_STATUS: i32 = 1;

/// Starts the monitor thread.
///
/// The signal handlers are installed before this function returns,
/// so every signal delivered afterwards is seen by the monitor.
pub fn spawn(profile: CpuProfile) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("Failed to create the signal monitor's runtime")?;

    let signals = {
        let _guard = rt.enter();
        Signals::register()?
    };

    thread::Builder::new()
        .name("signal-monitor".into())
        .spawn(move || {
            let name = rt.block_on(signals.recv());
            on_signal(name, &profile);
        })
        .context("Failed to spawn the signal monitor")?;

    log::debug!("Signal monitor started");
    Ok(())
}

/// Releases the profile, dumps the threads, and exits.
fn on_signal(name: &str, profile: &CpuProfile) -> ! {
    if let Err(e) = profile.release() {
        eprintln!("{:#}", e);
    }

    let stderr = io::stderr();
    let mut stderr = stderr.lock();
    let _ = writeln!(stderr, "Received {}, dumping threads", name);
    let _ = dump_threads(&mut stderr);
    let _ = stderr.flush();

    std::process::exit(EXIT_STATUS);
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    pipe: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Installs the handlers.  Must be called within a runtime.
    fn register() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Signals {
            interrupt: signal(SignalKind::interrupt())
                .context("Failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?,
            hangup: signal(SignalKind::hangup())
                .context("Failed to install SIGHUP handler")?,
            pipe: signal(SignalKind::pipe())
                .context("Failed to install SIGPIPE handler")?,
        })
    }

    /// Waits for the first signal and returns its name.
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.pipe.recv() => "SIGPIPE",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> Result<Self> {
        Ok(Signals)
    }

    async fn recv(self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl-C"
    }
}

/// Describes every thread of the process.
///
/// On Linux, the threads are enumerated in `/proc/self/task`, and
/// their state, wait channel and, if readable, kernel stack are
/// printed.  The monitor's own backtrace follows, even if the threads
/// cannot be enumerated.
pub fn dump_threads(sink: &mut dyn Write) -> io::Result<()> {
    dump_threads_in(sink, Path::new("/proc/self/task"))
}

#[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
fn dump_threads_in(sink: &mut dyn Write, tasks: &Path) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        match list_tasks(tasks) {
            Ok(tids) => {
                writeln!(sink, "{} thread(s):", tids.len())?;
                for tid in tids {
                    dump_task(sink, &tasks.join(tid.to_string()), tid)?;
                }
            }
            Err(e) => writeln!(sink, "Failed to list threads in {}: {}",
                               tasks.display(), e)?,
        }
        writeln!(sink)?;
    }

    let current = thread::current();
    writeln!(sink, "Backtrace of thread {:?}:",
             current.name().unwrap_or("<unnamed>"))?;
    writeln!(sink, "{}", Backtrace::force_capture())?;
    Ok(())
}

/// Returns the sorted thread ids in `tasks`.
#[cfg(target_os = "linux")]
fn list_tasks(tasks: &Path) -> io::Result<Vec<u32>> {
    let mut tids = std::fs::read_dir(tasks)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str()
                    .and_then(|n| n.parse::<u32>().ok()))
        .collect::<Vec<_>>();
    tids.sort_unstable();
    Ok(tids)
}

#[cfg(target_os = "linux")]
fn dump_task(sink: &mut dyn Write, dir: &Path, tid: u32) -> io::Result<()> {
    let read = |file: &str| std::fs::read_to_string(dir.join(file)).ok();

    let comm = read("comm").unwrap_or_default();
    let state = read("stat").as_deref().and_then(task_state).unwrap_or('?');
    let wchan = read("wchan").unwrap_or_default();

    writeln!(sink, "thread {} {:?}: state {}{}", tid, comm.trim(), state,
             match wchan.trim() {
                 "" | "0" => String::new(),
                 w => format!(", waiting in {}", w),
             })?;

    // Only readable with CAP_SYS_ADMIN.
    if let Some(stack) = read("stack") {
        for frame in stack.lines() {
            writeln!(sink, "    {}", frame)?;
        }
    }
    Ok(())
}

/// Extracts the state from the contents of a `stat` file.
///
/// The command name is enclosed in parentheses and may itself contain
/// parentheses and spaces, so the state is the first field after the
/// last closing parenthesis.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn task_state(stat: &str) -> Option<char> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}
