//! Errors specific to symdecrypt.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors returned while negotiating the decryption of a message.
pub enum Error {
    /// A password for unlocking a secret key was requested.
    ///
    /// Only passwords for symmetrically encrypted session keys are
    /// supported.
    #[error("Decryption mode not supported: decrypting secret keys")]
    ModeNotSupported,

    /// The password was requested a second time.
    ///
    /// A message with a single password-encrypted session key never
    /// needs to ask twice.  A second request means the password was
    /// wrong, or that the message is malformed.
    #[error("Password already negotiated")]
    AlreadyNegotiated,

    /// The message does not contain an encryption container.
    #[error("Message is not encrypted")]
    NotEncrypted,

    /// The encryption container is not integrity protected.
    ///
    /// Symmetrically Encrypted Data packets predate the modification
    /// detection code, so their plaintext can never be verified.
    #[error("Encryption container has no integrity protection")]
    NoIntegrityProtection,

    /// The encryption container ended without a modification
    /// detection code.
    #[error("Message is missing its modification detection code")]
    MissingMdc,

    /// The message was decrypted, but contains no literal data.
    #[error("Encrypted message contains no literal data")]
    NoLiteralData,
}
