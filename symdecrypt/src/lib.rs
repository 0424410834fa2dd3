//! Streaming decryption of password-encrypted OpenPGP messages.
//!
//! This crate implements `symdecrypt`, a filter that decrypts a
//! symmetrically encrypted OpenPGP message and writes the plaintext
//! to stdout.  The pieces are:
//!
//!   - [`keyring`]: the key lookup capability.  symdecrypt never has
//!     any keys, so it cannot fall back to public-key decryption.
//!   - [`prompt`]: hands out the password, once.
//!   - [`message`]: parses and decrypts the message, and exposes the
//!     plaintext before its integrity is known.
//!   - [`commands`]: drives a run, mapping every failure to the
//!     phase it happened in.
//!   - [`monitor`] and [`profile`]: diagnostics on signals, and CPU
//!     profiling.
//!
//! # Streaming and integrity
//!
//! The plaintext is released as it is decrypted.  The modification
//! detection code that authenticates it trails the data, so a
//! consumer reading the output incrementally may see bytes that later
//! turn out to have been tampered with.  The run then fails, but the
//! output is not retracted.

pub mod commands;
mod error;
pub use error::Error;
pub mod keyring;
pub mod message;
pub mod monitor;
pub mod profile;
pub mod prompt;
