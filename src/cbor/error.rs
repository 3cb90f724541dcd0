use core::fmt;
use std::error;

/// The error type for the `cbor` module.
#[derive(Debug)]
pub enum CborError {
    /// Wraps errors from `serde_cbor`.
    SerdeCbor(serde_cbor::Error),
    /// Tried to encode/decode CBOR sequence of more than 23 items.
    TooManyItems,
    /// Found a different kind of item than expected.
    UnexpectedItem,
    /// The input ended in the middle of an item.
    Truncated,
}

impl From<serde_cbor::Error> for CborError {
    fn from(e: serde_cbor::Error) -> CborError {
        CborError::SerdeCbor(e)
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborError::SerdeCbor(e) => write!(f, "CBOR error: {}", e),
            CborError::TooManyItems => write!(
                f,
                "CBOR error: can't decode CBOR sequence of more than 23 items"
            ),
            CborError::UnexpectedItem => {
                write!(f, "CBOR error: unexpected item type")
            }
            CborError::Truncated => write!(f, "CBOR error: input truncated"),
        }
    }
}

impl error::Error for CborError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CborError::SerdeCbor(e) => Some(e),
            _ => None,
        }
    }
}
