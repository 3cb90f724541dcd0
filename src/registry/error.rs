use core::fmt;
use std::error;

use crate::cbor;

/// The error type for building a `CredentialRegistry`.
#[derive(Debug)]
pub enum RegistryError {
    /// Two different credentials would be found under this key.
    DuplicateKey(Vec<u8>),
    /// The credential is not a CBOR data item.
    InvalidCredential(cbor::CborError),
    /// Wraps errors from `hex`.
    Hex(hex::FromHexError),
}

impl From<hex::FromHexError> for RegistryError {
    fn from(e: hex::FromHexError) -> RegistryError {
        RegistryError::Hex(e)
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::DuplicateKey(key) => write!(
                f,
                "Different credentials share the key {}",
                hex::encode(key)
            ),
            RegistryError::InvalidCredential(e) => {
                write!(f, "Credential is not valid CBOR: {}", e)
            }
            RegistryError::Hex(e) => e.fmt(f),
        }
    }
}

impl error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RegistryError::InvalidCredential(e) => Some(e),
            RegistryError::Hex(e) => Some(e),
            _ => None,
        }
    }
}
