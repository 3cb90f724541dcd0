//! Turns a completed
//! [EDHOC](https://datatracker.ietf.org/doc/rfc9528/)
//! handshake into an established
//! [OSCORE](https://tools.ietf.org/html/rfc8613)
//! security context, sending EDHOC `message_3` combined with the first
//! protected request as described in
//! [RFC 9668](https://datatracker.ietf.org/doc/rfc9668/).
//!
//! The EDHOC state machine itself is not part of this crate. It is consumed
//! through the [`edhoc::Initiator`] trait, so any implementation providing
//! `message_1` to `message_3` and the `EDHOC_Exporter` can be plugged in.
//! The same goes for the CoAP transport, see [`session::Transport`].
//!
//! The flow on the initiator side is driven by [`session::Handshake`]:
//! send `message_1`, receive `message_2`, look up the responder's
//! credential in a [`registry::CredentialRegistry`], derive the OSCORE
//! context and send the first request with `message_3` piggybacked.
//!
//! ## Security
//! This should **not currently be used in production code**, use at your own
//! risk.

// Unusual byte groupings are used for consistency with RFC.
#[allow(clippy::unusual_byte_groupings)]
mod cbor;

pub mod edhoc;
pub mod oscore;
pub mod registry;
pub mod session;

pub use cbor::CborError;
