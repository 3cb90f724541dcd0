//! The errors of the `edhoc` module.

use core::fmt;
use std::error;

use crate::cbor;

/// The error type for everything that can go wrong while talking to the
/// EDHOC implementation, or to the other party.
#[derive(Debug)]
pub enum EdhocError {
    /// The other party sent an EDHOC error message with this code and
    /// diagnostic text. On receiving this, abort the protocol.
    PeerError(i32, String),
    /// An integer connection identifier outside of -24..=23.
    InvalidConnectionId(i8),
    /// The EDHOC implementation failed or rejected its input.
    Engine(String),
    /// Wraps errors from the `cbor` module.
    Cbor(cbor::CborError),
}

impl From<cbor::CborError> for EdhocError {
    fn from(e: cbor::CborError) -> EdhocError {
        EdhocError::Cbor(e)
    }
}

impl fmt::Display for EdhocError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EdhocError::PeerError(code, info) => {
                write!(f, "Peer sent error message ({}): {}", code, info)
            }
            EdhocError::InvalidConnectionId(n) => write!(
                f,
                "Connection identifier {} doesn't fit in one byte",
                n
            ),
            EdhocError::Engine(e) => write!(f, "EDHOC error: {}", e),
            EdhocError::Cbor(e) => e.fmt(f),
        }
    }
}

impl error::Error for EdhocError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            EdhocError::Cbor(e) => Some(e),
            _ => None,
        }
    }
}
