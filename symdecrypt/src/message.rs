//! Reading password-encrypted messages.
//!
//! [`read_message`] parses a message up to its literal data packet,
//! decrypting the encryption container on the way.  The returned
//! [`MessageDetails`] exposes the literal data as an
//! [`UnverifiedBody`].  The integrity of the container can only be
//! established once the body has been read completely, because the
//! modification detection code trails the data.  Until then,
//! [`MessageDetails::verdict`] returns `None`.

use std::io::{self, Read};

use sequoia_openpgp as openpgp;
use openpgp::Packet;
use openpgp::Result;
use openpgp::packet::{PKESK, SKESK, Tag};
use openpgp::parse::{
    Parse,
    PacketParser,
    PacketParserBuilder,
    PacketParserResult,
};
use openpgp::types::{KeyFlags, SymmetricAlgorithm};

use crate::Error;
use crate::keyring::{KeySource, SecretKey};
use crate::prompt::Negotiator;

/// Tunes how messages are parsed.
#[derive(Debug, Default, Clone)]
pub struct Config {
    /// Packets larger than this are not buffered by the parser.
    ///
    /// If `None`, the parser's default is used.
    pub max_packet_size: Option<u32>,
}

/// The outcome of the integrity check.
#[derive(Debug)]
pub enum IntegrityVerdict {
    /// The encryption container is intact.
    Verified,
    /// The message has been tampered with, or is malformed.
    Failed(anyhow::Error),
}

impl From<Result<()>> for IntegrityVerdict {
    fn from(r: Result<()>) -> Self {
        match r {
            Ok(()) => IntegrityVerdict::Verified,
            Err(e) => IntegrityVerdict::Failed(e),
        }
    }
}

/// The kind of encryption container the literal data was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    /// Symmetrically Encrypted and Integrity Protected data, protected
    /// by a trailing MDC.
    Seip,
    /// AEAD encrypted data, protected chunk by chunk.
    Aed,
}

/// A decrypted message.
pub struct MessageDetails<'a> {
    sym_algo: SymmetricAlgorithm,
    /// The plaintext, not yet authenticated.
    pub unverified_body: UnverifiedBody<'a>,
}

impl<'a> MessageDetails<'a> {
    /// Returns the algorithm the message is encrypted with.
    pub fn sym_algo(&self) -> SymmetricAlgorithm {
        self.sym_algo
    }

    /// Returns the integrity verdict.
    ///
    /// This is `None` until the unverified body has been read to the
    /// end.
    pub fn verdict(&self) -> Option<&IntegrityVerdict> {
        self.unverified_body.verdict.as_ref()
    }

    /// Consumes the message, returning the integrity verdict.
    ///
    /// Like [`MessageDetails::verdict`], this is `None` if the
    /// unverified body has not been read to the end.
    pub fn into_verdict(self) -> Option<IntegrityVerdict> {
        self.unverified_body.verdict
    }
}

/// The literal data of a decrypted message.
///
/// Reading returns plaintext as soon as it is decrypted.  When the
/// end is reached, the rest of the message is parsed and the
/// integrity verdict is recorded.
pub struct UnverifiedBody<'a> {
    literal: Option<PacketParser<'a>>,
    container: Container,
    verdict: Option<IntegrityVerdict>,
}

impl io::Read for UnverifiedBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.literal.as_mut() {
            Some(pp) => pp.read(buf)?,
            None => return Ok(0),
        };

        if n == 0 && ! buf.is_empty() {
            if let Some(pp) = self.literal.take() {
                let verdict = IntegrityVerdict::from(
                    finish(pp, self.container));
                log::debug!("Integrity verdict: {:?}", verdict);
                self.verdict = Some(verdict);
            }
        }

        Ok(n)
    }
}

/// Parses the remainder of the message after the literal data, and
/// checks the encryption container's integrity.
fn finish(literal: PacketParser, container: Container) -> Result<()> {
    let mut mdc = None;
    let mut ppr = PacketParserResult::Some(literal);
    while let PacketParserResult::Some(pp) = ppr {
        let (packet, next) = pp.recurse()?;
        if let Packet::MDC(mdc_packet) = packet {
            mdc = Some(mdc_packet.valid());
        }
        ppr = next;
    }

    match (container, mdc) {
        (Container::Aed, _) => Ok(()),
        (Container::Seip, Some(true)) => Ok(()),
        (Container::Seip, Some(false)) =>
            Err(openpgp::Error::ManipulatedMessage.into()),
        (Container::Seip, None) => Err(Error::MissingMdc.into()),
    }
}

/// Parses an encrypted message from `source`.
///
/// Secret keys for PKESKs are looked up in `keyring`, and offered to
/// `negotiator` as candidates to unlock.  SKESKs are decrypted with
/// the password `negotiator` hands out.  Parsing stops at the literal
/// data packet.
pub fn read_message<'a, R>(source: R,
                           keyring: &dyn KeySource,
                           mut negotiator: Negotiator,
                           config: Option<&Config>)
                           -> Result<MessageDetails<'a>>
    where R: io::Read + Send + Sync + 'a
{
    let mut builder = PacketParserBuilder::from_reader(source)?;
    if let Some(size) = config.and_then(|c| c.max_packet_size) {
        builder = builder.max_packet_size(size);
    }
    let mut ppr = builder.build()?;

    let mut pkesks: Vec<PKESK> = Vec::new();
    let mut skesks: Vec<SKESK> = Vec::new();
    let mut decrypted: Option<(Container, SymmetricAlgorithm)> = None;

    while let PacketParserResult::Some(mut pp) = ppr {
        match &pp.packet {
            Packet::PKESK(pkesk) => pkesks.push(pkesk.clone()),
            Packet::SKESK(skesk) => skesks.push(skesk.clone()),
            _ => (),
        }

        if pp.packet.tag() == Tag::SED {
            return Err(Error::NoIntegrityProtection.into());
        }

        let container = match pp.packet {
            Packet::SEIP(_) => Some(Container::Seip),
            #[allow(deprecated)]
            Packet::AED(_) => Some(Container::Aed),
            _ => None,
        };
        if let Some(container) = container {
            let sym_algo = decrypt_container(
                &mut pp, keyring, &mut negotiator, &pkesks, &skesks)?;
            log::debug!("Decrypted {:?} container using {}",
                        container, sym_algo);
            decrypted = Some((container, sym_algo));
        }

        let is_literal = if let Packet::Literal(literal) = &pp.packet {
            log::debug!("Literal data: format {}, filename {:?}",
                        literal.format(),
                        literal.filename()
                            .map(String::from_utf8_lossy));
            true
        } else {
            false
        };

        if is_literal {
            let (container, sym_algo) =
                decrypted.ok_or(Error::NotEncrypted)?;
            return Ok(MessageDetails {
                sym_algo,
                unverified_body: UnverifiedBody {
                    literal: Some(pp),
                    container,
                    verdict: None,
                },
            });
        }

        ppr = pp.recurse()?.1;
    }

    if decrypted.is_some() {
        Err(Error::NoLiteralData.into())
    } else {
        Err(Error::NotEncrypted.into())
    }
}

/// Decrypts the encryption container `pp` points to.
///
/// Asks `negotiator` for a password until one of the SKESKs yields a
/// session key that decrypts the container.  The negotiator refuses
/// to answer twice, which ends the loop.
fn decrypt_container(pp: &mut PacketParser,
                     keyring: &dyn KeySource,
                     negotiator: &mut Negotiator,
                     pkesks: &[PKESK],
                     skesks: &[SKESK])
                     -> Result<SymmetricAlgorithm>
{
    let candidates = candidate_keys(keyring, pkesks);

    loop {
        let password =
            negotiator.negotiate(&candidates, ! skesks.is_empty())?;

        for skesk in skesks {
            match skesk.decrypt(&password) {
                Ok((algo, session_key)) => {
                    match pp.decrypt(algo, &session_key) {
                        Ok(()) => return Ok(algo),
                        Err(e) => log::debug!("Session key rejected: {}", e),
                    }
                }
                Err(e) => log::debug!("Decrypting SKESK failed: {}", e),
            }
        }
    }
}

/// Returns the keys the PKESKs are addressed to.
fn candidate_keys(keyring: &dyn KeySource, pkesks: &[PKESK])
                  -> Vec<SecretKey> {
    let usage = KeyFlags::empty()
        .set_transport_encryption()
        .set_storage_encryption();

    pkesks.iter()
        .flat_map(|pkesk| {
            let recipient = pkesk.recipient();
            if recipient.is_wildcard() {
                keyring.decryption_keys()
            } else {
                keyring.keys_by_id_usage(recipient, &usage)
            }
        })
        .collect()
}
