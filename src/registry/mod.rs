//! The trusted peers, and how to find them by what they announce.

#[cfg_attr(tarpaulin, skip)]
mod error;

use std::collections::HashMap;
use tracing::{debug, info};

use crate::cbor;

pub use error::RegistryError;

/// The result type for the `registry` module.
pub type Result<T> = core::result::Result<T, RegistryError>;

/// The path through a CCS to its key identifier: `cnf` / `COSE_Key` / `kid`.
const KID_PATH: [i128; 3] = [8, 1, 2];

/// A peer's credential, the encoded CCS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    bytes: Vec<u8>,
    kid: Option<Vec<u8>>,
}

impl Credential {
    /// Parses the credential, extracting its key identifier if it has one.
    pub fn new(bytes: Vec<u8>) -> Result<Credential> {
        let value = cbor::decode_value(&bytes)
            .map_err(RegistryError::InvalidCredential)?;
        let kid = cbor::nested_bytes(&value, &KID_PATH).map(<[u8]>::to_vec);

        Ok(Credential { bytes, kid })
    }

    /// Parses the credential from its hex representation.
    pub fn from_hex(hex_str: &str) -> Result<Credential> {
        Credential::new(hex::decode(hex_str)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The key identifier, if the credential contains a `COSE_Key` with one.
    pub fn kid(&self) -> Option<&[u8]> {
        self.kid.as_deref()
    }
}

/// The credentials of all peers we're willing to talk to.
///
/// Each credential can be found both by its own encoding, for when the peer
/// sends it by value, and by its key identifier, for when the peer only
/// sends a reference.
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    entries: HashMap<Vec<u8>, Credential>,
}

impl CredentialRegistry {
    /// Builds the registry from trusted credentials.
    ///
    /// Fails if two distinct credentials end up under the same key.
    /// Credentials without a key identifier can only be found by value.
    pub fn new(
        credentials: impl IntoIterator<Item = Credential>,
    ) -> Result<CredentialRegistry> {
        let credentials: Vec<Credential> = credentials.into_iter().collect();
        let mut registry = CredentialRegistry::default();

        for credential in &credentials {
            match credential.kid() {
                Some(kid) => registry.insert(kid.to_vec(), credential)?,
                None => debug!(
                    credential = %hex::encode(credential.as_bytes()),
                    "Credential has no kid, only usable by value"
                ),
            }
        }
        for credential in &credentials {
            registry.insert(credential.as_bytes().to_vec(), credential)?;
        }

        info!(
            credentials = credentials.len(),
            keys = registry.len(),
            "Loaded credential registry"
        );
        Ok(registry)
    }

    /// Builds the registry from hex encoded credentials.
    pub fn from_hex<S: AsRef<str>>(
        credentials: impl IntoIterator<Item = S>,
    ) -> Result<CredentialRegistry> {
        let credentials = credentials
            .into_iter()
            .map(|c| Credential::from_hex(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        CredentialRegistry::new(credentials)
    }

    /// Returns the credential known under this identifier.
    pub fn lookup(&self, id: &[u8]) -> Option<&Credential> {
        self.entries.get(id)
    }

    /// The number of keys, which can be up to twice the number of
    /// credentials.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: Vec<u8>, credential: &Credential) -> Result<()> {
        match self.entries.get(&key) {
            // The same credential listed twice is harmless
            Some(existing) if existing == credential => Ok(()),
            Some(_) => Err(RegistryError::DuplicateKey(key)),
            None => {
                self.entries.insert(key, credential.clone());
                Ok(())
            }
        }
    }
}
