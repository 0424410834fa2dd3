//! CPU profiling.
//!
//! A [`CpuProfile`] samples the process while it is alive.  It is
//! shared between the main thread and the signal monitor, and the
//! profile is written by whichever of them calls
//! [`CpuProfile::release`] first.  Later calls do nothing.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use sequoia_openpgp as openpgp;
use openpgp::Result;

/// Sampling frequency in Hz.
#[cfg(unix)]
const FREQUENCY: i32 = 100;

#[cfg(unix)]
struct Active {
    guard: pprof::ProfilerGuard<'static>,
    sink: File,
    path: PathBuf,
}

#[cfg(not(unix))]
struct Active {
    path: PathBuf,
}

/// A running CPU profile that is written out exactly once.
#[derive(Clone)]
pub struct CpuProfile {
    active: Arc<Mutex<Option<Active>>>,
}

impl CpuProfile {
    /// Starts profiling into `path`.
    ///
    /// The file is created right away, so that a bad path is reported
    /// before any work is done.
    pub fn start<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let active = Active::start(path)?;
        Ok(CpuProfile {
            active: Arc::new(Mutex::new(Some(active))),
        })
    }

    /// Returns a profile that records nothing.
    pub fn disabled() -> Self {
        CpuProfile {
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Stops profiling and writes the profile.
    ///
    /// Only the first call does anything.  Returns whether this call
    /// wrote the profile.  A concurrent call blocks until the profile
    /// has been written.
    pub fn release(&self) -> Result<bool> {
        // The lock is held until the profile is on disk.
        let mut active = match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };

        match active.take() {
            Some(active) => {
                let path = active.path.clone();
                active.finish()
                    .with_context(|| format!(
                        "Failed to write CPU profile to {}", path.display()))?;
                log::info!("CPU profile written to {}", path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(unix)]
impl Active {
    fn start(path: PathBuf) -> Result<Self> {
        let sink = File::create(&path)
            .with_context(|| format!("Cpuprofile: failed to create {}",
                                     path.display()))?;
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(FREQUENCY)
            .build()
            .context("Cpuprofile: failed to start the profiler")?;
        log::debug!("Profiling into {}", path.display());
        Ok(Active { guard, sink, path })
    }

    fn finish(mut self) -> Result<()> {
        use pprof::protos::Message;

        let profile = self.guard.report().build()?.pprof()?;
        self.sink.write_all(&profile.encode_to_vec())?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(not(unix))]
impl Active {
    fn start(path: PathBuf) -> Result<Self> {
        Err(anyhow::anyhow!(
            "Cpuprofile: profiling is not supported on this platform \
             (requested {})", path.display()))
    }

    fn finish(self) -> Result<()> {
        // Unreachable: start always fails.
        Ok(())
    }
}
