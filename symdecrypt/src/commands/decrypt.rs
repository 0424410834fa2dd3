//! Decrypting and verifying a message.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};

use anyhow::Context;

use sequoia_openpgp as openpgp;
use openpgp::Result;
use openpgp::crypto::Password;

use crate::keyring::EmptyKeyRing;
use crate::message::{self, IntegrityVerdict};
use crate::prompt::Negotiator;

/// The step of a run that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Preparing the run: profiling, signal handling.
    Setup,
    /// Opening the input.
    Open,
    /// Parsing the message and decrypting the session key.
    ReadMessage,
    /// Streaming the plaintext to the output.
    Copy,
    /// Checking the integrity of the message.
    Integrity,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Phase::Setup => "setup",
            Phase::Open => "open",
            Phase::ReadMessage => "read-message",
            Phase::Copy => "copy",
            Phase::Integrity => "integrity",
        })
    }
}

/// A failed run.
#[derive(thiserror::Error, Debug)]
#[error("{phase}: {error:#}")]
pub struct Fatal {
    /// Where the run failed.
    pub phase: Phase,
    /// Why the run failed.
    pub error: anyhow::Error,
}

impl Fatal {
    pub fn new(phase: Phase, error: anyhow::Error) -> Self {
        Fatal { phase, error }
    }
}

/// Opens the given file, or stdin if `None`.
fn open_or_stdin(f: Option<&str>) -> Result<Box<dyn io::Read + Send + Sync>> {
    match f {
        Some(f) => Ok(Box::new(File::open(f)
                               .with_context(|| format!(
                                   "Failed to open input file {:?}", f))?)),
        None => Ok(Box::new(io::stdin())),
    }
}

/// Decrypts the message in `input` (or stdin) with `password`, and
/// writes the plaintext to `output`.
///
/// The plaintext is written as it is decrypted, before its integrity
/// has been established.  If the integrity check fails afterwards,
/// an error is returned, but the output is not retracted.  Callers
/// must not act on the output unless this function returns `Ok`.
pub fn decrypt(input: Option<&str>,
               output: &mut dyn Write,
               password: Password)
               -> std::result::Result<(), Fatal>
{
    let source = open_or_stdin(input)
        .map_err(|e| Fatal::new(Phase::Open, e))?;

    let mut md = message::read_message(source, &EmptyKeyRing,
                                       Negotiator::new(password), None)
        .context("Failed to read message")
        .map_err(|e| Fatal::new(Phase::ReadMessage, e))?;
    log::info!("Message header parsed ({} encrypted), \
                streaming unverified plaintext", md.sym_algo());

    io::copy(&mut md.unverified_body, &mut *output)
        .and_then(|_| output.flush())
        .context("Failed to copy unverified plaintext")
        .map_err(|e| Fatal::new(Phase::Copy, e))?;

    // Only now that the body has been drained is the verdict final.
    match md.into_verdict() {
        Some(IntegrityVerdict::Verified) => Ok(()),
        Some(IntegrityVerdict::Failed(e)) => Err(Fatal::new(
            Phase::Integrity,
            e.context("Integrity check FAILED"))),
        None => Err(Fatal::new(
            Phase::Integrity,
            anyhow::anyhow!("Integrity check FAILED: \
                             plaintext was not read to the end"))),
    }
}
