//! The interface to an external EDHOC implementation, together with the
//! parts of EDHOC that are about transporting its messages over CoAP.
//!
//! This crate doesn't compute `message_1` to `message_3` itself. Whatever
//! does has to implement [`Initiator`], which is the narrow view the
//! [`session`](crate::session) module needs of a handshake in progress.

#[cfg_attr(tarpaulin, skip)]
mod error;
mod util;

use serde::Deserialize;

pub use error::EdhocError;
pub use util::{
    build_error_message, extract_error_message, fail_on_error_message,
    message_1_payload,
};

/// The result type for the `edhoc` module.
pub type Result<T> = core::result::Result<T, EdhocError>;

/// Cipher suite 2: AES-CCM-16-64-128, SHA-256, 8, P-256, ES256,
/// AES-CCM-16-64-128, SHA-256.
pub const SUITE_2: i32 = 2;

/// The number of the CoAP EDHOC option, signalling that a request carries
/// EDHOC `message_3` in front of its OSCORE payload.
pub const EDHOC_OPTION: usize = 21;

/// An EDHOC connection identifier.
///
/// Identifiers that are a single byte and happen to be the encoding of a CBOR
/// integer between -24 and 23 are sent as that integer on the wire, all
/// others as a byte string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConnectionId {
    /// An integer between -24 and 23.
    Int(i8),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl ConnectionId {
    /// Returns the identifier as the byte string used for OSCORE.
    ///
    /// Integers map to their CBOR encoding, byte strings to themselves, so
    /// `Int(8)` and `Bytes([0x08])` are the same OSCORE identifier.
    /// Integers outside of -24..=23 are rejected.
    pub fn to_oscore_id(&self) -> Result<Vec<u8>> {
        match self {
            ConnectionId::Int(n) if !(-24..=23).contains(n) => {
                Err(EdhocError::InvalidConnectionId(*n))
            }
            ConnectionId::Int(n) => Ok(crate::cbor::encode(n)?),
            ConnectionId::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<i8> for ConnectionId {
    fn from(n: i8) -> ConnectionId {
        ConnectionId::Int(n)
    }
}

impl From<Vec<u8>> for ConnectionId {
    fn from(bytes: Vec<u8>) -> ConnectionId {
        ConnectionId::Bytes(bytes)
    }
}

/// How the initiator transports its credential in `message_3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CredentialTransfer {
    /// Only a key identifier is sent, the responder has the credential.
    ByReference,
    /// The full credential is sent.
    ByValue,
}

/// An External Authorization Data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EadItem {
    pub label: i32,
    pub value: Option<Vec<u8>>,
}

impl EadItem {
    /// Whether the receiver has to abort if it doesn't understand the item.
    pub fn is_critical(&self) -> bool {
        self.label < 0
    }
}

/// What the initiator learns from `message_2` before verifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message2Info {
    /// The connection identifier the responder chose, `C_R`.
    pub c_r: ConnectionId,
    /// How the responder refers to its credential. Either the `kid` of it,
    /// or the full credential.
    pub id_cred_r: Vec<u8>,
    pub ead_2: Option<EadItem>,
}

/// The completed part of a handshake, as far as deriving an OSCORE context
/// is concerned.
pub trait Exporter {
    /// The cipher suite that was agreed on.
    fn selected_cipher_suite(&self) -> i32;

    /// The `EDHOC_Exporter` interface.
    ///
    /// # Arguments
    /// * `label` - The exporter label, 0 for the OSCORE master secret and 1
    ///   for the OSCORE master salt.
    /// * `context` - Context information, empty for OSCORE.
    /// * `length` - The number of bytes to produce.
    fn edhoc_exporter(
        &mut self,
        label: u8,
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>>;
}

/// The initiator's view of an EDHOC implementation.
///
/// The methods are called in the order they're declared in, each at most once
/// per handshake.
pub trait Initiator: Exporter {
    /// Returns `message_1` for the given connection identifier `C_I`.
    fn prepare_first_message(&mut self, c_i: &ConnectionId) -> Result<Vec<u8>>;

    /// Decrypts `message_2` far enough to tell who the responder claims to be.
    fn parse_second_message(
        &mut self,
        message_2: &[u8],
    ) -> Result<Message2Info>;

    /// Verifies `message_2` against the responder's credential.
    ///
    /// # Arguments
    /// * `identity` - The initiator's private authentication key.
    /// * `credential` - The initiator's credential, `CRED_I`.
    /// * `peer_credential` - The responder's credential, `CRED_R`.
    fn verify_peer(
        &mut self,
        identity: &[u8],
        credential: &[u8],
        peer_credential: &[u8],
    ) -> Result<()>;

    /// Returns `message_3` and `PRK_out`.
    fn prepare_final_message(
        &mut self,
        transfer: CredentialTransfer,
    ) -> Result<(Vec<u8>, Vec<u8>)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscore_ids() {
        assert_eq!(vec![0x08], ConnectionId::Int(8).to_oscore_id().unwrap());
        assert_eq!(vec![0x20], ConnectionId::Int(-1).to_oscore_id().unwrap());
        assert_eq!(vec![0x37], ConnectionId::Int(-24).to_oscore_id().unwrap());
        assert_eq!(
            vec![0xAB, 0xCD],
            ConnectionId::from(vec![0xAB, 0xCD]).to_oscore_id().unwrap()
        );
        assert_eq!(vec![0x17], ConnectionId::Int(23).to_oscore_id().unwrap());
        for n in &[24, -25, i8::MAX, i8::MIN] {
            match ConnectionId::Int(*n).to_oscore_id() {
                Err(EdhocError::InvalidConnectionId(m)) => assert_eq!(*n, m),
                _ => panic!("{} doesn't encode in one byte", n),
            }
        }
        // The same identifier, in both of its forms
        assert_eq!(
            ConnectionId::Int(8).to_oscore_id().unwrap(),
            ConnectionId::Bytes(vec![0x08]).to_oscore_id().unwrap()
        );
    }

    #[test]
    fn criticality() {
        assert!(EadItem {
            label: -3,
            value: None
        }
        .is_critical());
        assert!(!EadItem {
            label: 3,
            value: Some(vec![1])
        }
        .is_critical());
    }
}
