//! Key lookup capabilities offered to the decryptor.
//!
//! A decryptor that supports public-key encrypted messages needs a
//! way to find the secret keys a message is addressed to.  This
//! module defines that capability as a trait.  symdecrypt only
//! supports password-encrypted messages, so the only implementation
//! is [`EmptyKeyRing`], which never has any keys.

use sequoia_openpgp as openpgp;
use openpgp::KeyID;
use openpgp::packet::Key;
use openpgp::packet::key::{SecretParts, UnspecifiedRole};
use openpgp::types::KeyFlags;

/// A secret key that could be used to decrypt a PKESK.
pub type SecretKey = Key<SecretParts, UnspecifiedRole>;

/// Looks up secret keys.
pub trait KeySource {
    /// Returns the keys with the given Key ID.
    fn keys_by_id(&self, id: &KeyID) -> Vec<SecretKey>;

    /// Returns all keys that can be used for decryption.
    fn decryption_keys(&self) -> Vec<SecretKey>;

    /// Returns the keys with the given Key ID that have at least one
    /// of the capabilities in `usage`.
    fn keys_by_id_usage(&self, id: &KeyID, usage: &KeyFlags)
                        -> Vec<SecretKey>;
}

/// A key source without any keys.
///
/// Handing this to the decryptor restricts it to password-based
/// decryption.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyKeyRing;

impl KeySource for EmptyKeyRing {
    fn keys_by_id(&self, _: &KeyID) -> Vec<SecretKey> {
        Vec::new()
    }

    fn decryption_keys(&self) -> Vec<SecretKey> {
        Vec::new()
    }

    fn keys_by_id_usage(&self, _: &KeyID, _: &KeyFlags) -> Vec<SecretKey> {
        Vec::new()
    }
}
