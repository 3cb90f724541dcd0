//! Getting from an EDHOC handshake to an OSCORE session.
//!
//! [`Handshake`] runs the initiator side of the exchange against a
//! [`Transport`], [`derive`] turns the handshake into an
//! [`EdhocSecurityContext`], which sends `message_3` along with the first
//! request it protects.

mod config;
mod derive;
#[cfg_attr(tarpaulin, skip)]
mod error;
#[cfg(test)]
mod mock;
mod orchestrator;
mod piggyback;
mod transport;

pub use config::InitiatorConfig;
pub use derive::{
    algorithms_for_suite, derive, HandshakeOutcome, LABEL_MASTER_SALT,
    LABEL_MASTER_SECRET, MASTER_SALT_LEN, REPLAY_WINDOW_SIZE,
};
pub use error::Error;
pub use orchestrator::{Handshake, Session, State};
pub use piggyback::{split_combined_request, EdhocSecurityContext};
pub use transport::{SecureTransport, Transport, TransportError};

/// The result type for the `session` module.
pub type Result<T> = core::result::Result<T, Error>;
