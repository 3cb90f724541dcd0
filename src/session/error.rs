use core::fmt;
use std::error;

use super::transport::TransportError;
use crate::{cbor, edhoc::EdhocError, oscore};

/// The error type for the `session` module.
///
/// Everything but `Transport` means the handshake attempt is over for good.
/// Only a fresh handshake can lead to a session then.
#[derive(Debug)]
pub enum Error {
    /// The handshake agreed on a cipher suite we can't derive a context for.
    UnsupportedSuite(i32),
    /// The responder claimed an identity that's not in the registry.
    UnknownPeer(Vec<u8>),
    /// The responder is known, but couldn't prove it. Don't retry.
    AuthenticationFailed(EdhocError),
    /// Sender and recipient ID would be the same.
    IdentifierCollision(Vec<u8>),
    /// `message_2` carried a critical EAD item we don't understand.
    CriticalEad(i32),
    /// The exchange with the responder failed.
    Transport(TransportError),
    /// Wraps errors from the `edhoc` module.
    Edhoc(EdhocError),
    /// Wraps errors from the `oscore` module.
    Oscore(oscore::Error),
    /// Wraps errors from the `cbor` module.
    Cbor(cbor::CborError),
}

impl Error {
    /// Whether starting over with a new handshake might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Error {
        Error::Transport(e)
    }
}

impl From<EdhocError> for Error {
    fn from(e: EdhocError) -> Error {
        Error::Edhoc(e)
    }
}

impl From<oscore::Error> for Error {
    fn from(e: oscore::Error) -> Error {
        Error::Oscore(e)
    }
}

impl From<cbor::CborError> for Error {
    fn from(e: cbor::CborError) -> Error {
        Error::Cbor(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnsupportedSuite(suite) => {
                write!(f, "Unsupported cipher suite {}", suite)
            }
            Error::UnknownPeer(id) => {
                write!(f, "Unknown peer {}", hex::encode(id))
            }
            Error::AuthenticationFailed(e) => {
                write!(f, "Peer authentication failed: {}", e)
            }
            Error::IdentifierCollision(id) => write!(
                f,
                "Sender and recipient ID are both {}",
                hex::encode(id)
            ),
            Error::CriticalEad(label) => {
                write!(f, "Unsupported critical EAD item {}", label)
            }
            Error::Transport(e) => e.fmt(f),
            Error::Edhoc(e) => e.fmt(f),
            Error::Oscore(e) => e.fmt(f),
            Error::Cbor(e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::AuthenticationFailed(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Edhoc(e) => Some(e),
            Error::Oscore(e) => Some(e),
            Error::Cbor(e) => Some(e),
            _ => None,
        }
    }
}
