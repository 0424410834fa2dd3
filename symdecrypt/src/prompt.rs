//! Single-use password negotiation.
//!
//! The decryptor asks for a password through a [`Negotiator`].  The
//! password is handed out at most once per negotiator: asking again
//! fails, it is never silently reused.

use std::fmt;

use sequoia_openpgp as openpgp;
use openpgp::crypto::Password;
use openpgp::Result;

use crate::Error;
use crate::keyring::SecretKey;

/// Where a negotiator is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The password has not been handed out.
    Fresh,
    /// The password has been handed out.  Terminal.
    Spent,
}

/// Supplies the operator's password to the decryptor, once.
pub struct Negotiator {
    password: Password,
    state: State,
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Negotiator {
    /// Returns a fresh negotiator for the given password.
    pub fn new<P: Into<Password>>(password: P) -> Self {
        Negotiator {
            password: password.into(),
            state: State::Fresh,
        }
    }

    /// Returns the negotiator's state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Answers a password request.
    ///
    /// `candidates` are the encrypted secret keys the decryptor could
    /// unlock, and `symmetric` is whether the decryptor wants the
    /// password for a symmetrically encrypted session key instead.
    /// Unlocking secret keys is never supported.  The first
    /// symmetric request returns the password, every later one fails
    /// with [`Error::AlreadyNegotiated`].
    pub fn negotiate(&mut self, candidates: &[SecretKey], symmetric: bool)
                     -> Result<Password> {
        if ! symmetric {
            log::debug!("Refusing to unlock {} secret key(s)",
                        candidates.len());
            return Err(Error::ModeNotSupported.into());
        }

        match self.state {
            State::Fresh => {
                self.state = State::Spent;
                Ok(self.password.clone())
            }
            State::Spent => Err(Error::AlreadyNegotiated.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn error_of(r: Result<Password>) -> Error {
        r.err().expect("negotiation should fail")
            .downcast::<Error>().expect("negotiation error")
    }

    #[test]
    fn first_symmetric_request_succeeds() -> Result<()> {
        let mut n = Negotiator::new("swordfish");
        assert_eq!(n.state(), State::Fresh);

        let p = n.negotiate(&[], true)?;
        p.map(|p| assert_eq!(&p[..], &b"swordfish"[..]));
        assert_eq!(n.state(), State::Spent);
        Ok(())
    }

    #[test]
    fn second_symmetric_request_fails() -> Result<()> {
        let mut n = Negotiator::new("swordfish");
        n.negotiate(&[], true)?;

        for _ in 0..3 {
            assert_eq!(error_of(n.negotiate(&[], true)),
                       Error::AlreadyNegotiated);
            assert_eq!(n.state(), State::Spent);
        }
        Ok(())
    }

    #[test]
    fn key_unlock_is_always_refused() -> Result<()> {
        let mut n = Negotiator::new("swordfish");

        // Before the password is handed out...
        assert_eq!(error_of(n.negotiate(&[], false)), Error::ModeNotSupported);
        assert_eq!(n.state(), State::Fresh);

        // ... refusing did not spend it ...
        n.negotiate(&[], true)?;

        // ... and after.
        assert_eq!(error_of(n.negotiate(&[], false)), Error::ModeNotSupported);
        assert_eq!(error_of(n.negotiate(&[], false)), Error::ModeNotSupported);
        Ok(())
    }

    #[test]
    fn negotiators_do_not_share_state() -> Result<()> {
        let mut a = Negotiator::new("a");
        let mut b = Negotiator::new("b");

        a.negotiate(&[], true)?;
        assert_eq!(b.state(), State::Fresh);
        b.negotiate(&[], true)?.map(|p| assert_eq!(&p[..], &b"b"[..]));
        assert_eq!(error_of(a.negotiate(&[], true)), Error::AlreadyNegotiated);
        Ok(())
    }

    #[test]
    fn debug_does_not_leak_password() {
        let n = Negotiator::new("swordfish");
        assert!(! format!("{:?}", n).contains("swordfish"));
    }

    #[test]
    fn empty_password_is_handed_out() -> Result<()> {
        let mut n = Negotiator::new("");
        n.negotiate(&[], true)?.map(|p| assert!(p.is_empty()));
        Ok(())
    }
}
