use coap_lite::{error as coap, CoapOption};
use core::fmt;
use std::error;

use crate::cbor;

/// The catch-all error type for this module, mostly just wrapping errors from
/// various libraries.
#[derive(Debug)]
pub enum Error {
    /// CoAP request doesn't contain OSCORE option.
    NoOscoreOption,
    /// CoAP request doesn't have kid or piv.
    NoKidPiv,
    /// This message has been received already.
    ReplayDetected,
    /// Message contains an unsupported option.
    UnsupportedOption(CoapOption),
    /// A sender or recipient ID doesn't fit into the nonce.
    IdTooLong(Vec<u8>),
    /// The sender sequence number can't be represented in a partial IV any
    /// more, the context has to be replaced.
    SequenceNumberExhausted,
    /// The decrypted plaintext doesn't contain a CoAP code.
    MalformedPlaintext,
    /// Wraps errors from the `cbor` module.
    Cbor(cbor::CborError),
    /// Wraps errors from `hkdf`.
    Hkdf(hkdf::InvalidLength),
    /// Error in `ccm`.
    Aead,
    /// Wraps errors from `coap_lite`.
    Coap(coap::MessageError),
}

impl From<cbor::CborError> for Error {
    fn from(e: cbor::CborError) -> Error {
        Error::Cbor(e)
    }
}

impl From<hkdf::InvalidLength> for Error {
    fn from(e: hkdf::InvalidLength) -> Error {
        Error::Hkdf(e)
    }
}

impl From<ccm::aead::Error> for Error {
    fn from(_: ccm::aead::Error) -> Error {
        Error::Aead
    }
}

impl From<coap::MessageError> for Error {
    fn from(e: coap::MessageError) -> Error {
        Error::Coap(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoOscoreOption => {
                write!(f, "CoAP request doesn't contain OSCORE option")
            }
            Error::NoKidPiv => {
                write!(f, "CoAP request doesn't have kid or piv")
            }
            Error::ReplayDetected => {
                write!(f, "This message has been received already")
            }
            Error::UnsupportedOption(o) => {
                write!(f, "Message contains an unsupported option: {:?}", o)
            }
            Error::IdTooLong(id) => write!(
                f,
                "ID {} is too long for the nonce of the AEAD",
                hex::encode(id)
            ),
            Error::SequenceNumberExhausted => {
                write!(f, "Sender sequence number exhausted")
            }
            Error::MalformedPlaintext => {
                write!(f, "Decrypted plaintext is not a CoAP message")
            }
            Error::Cbor(e) => e.fmt(f),
            Error::Hkdf(e) => e.fmt(f),
            Error::Aead => write!(f, "Error using AEAD"),
            Error::Coap(e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Cbor(e) => Some(e),
            _ => None,
        }
    }
}
