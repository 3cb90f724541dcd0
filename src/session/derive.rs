use tracing::debug;

use super::{error::Error, piggyback::EdhocSecurityContext, Result};
use crate::{
    edhoc::{ConnectionId, Exporter, SUITE_2},
    oscore::{AeadAlgorithm, HashFunction, Parameters, SecurityContext},
};

/// The number of sequence numbers the replay window tracks.
pub const REPLAY_WINDOW_SIZE: u32 = 32;
/// The length of the OSCORE master salt taken from the exporter.
pub const MASTER_SALT_LEN: usize = 8;
/// Exporter label for the OSCORE master secret.
pub const LABEL_MASTER_SECRET: u8 = 0;
/// Exporter label for the OSCORE master salt.
pub const LABEL_MASTER_SALT: u8 = 1;

/// What a finished handshake leaves for the OSCORE context.
pub struct HandshakeOutcome<'a, E: Exporter + ?Sized> {
    /// Gives access to the negotiated suite and the `EDHOC_Exporter`.
    pub exporter: &'a mut E,
    /// `message_3`, if it still has to be sent.
    pub pending_message: Option<Vec<u8>>,
}

/// Returns the OSCORE algorithms belonging to an EDHOC cipher suite.
pub fn algorithms_for_suite(
    suite: i32,
) -> Result<(AeadAlgorithm, HashFunction)> {
    match suite {
        SUITE_2 => Ok((AeadAlgorithm::AesCcm16_64_128, HashFunction::Sha256)),
        other => Err(Error::UnsupportedSuite(other)),
    }
}

/// Derives the OSCORE security context from a completed handshake.
///
/// The identifier the peer chose for itself is our Sender ID, ours is our
/// Recipient ID. Fails if they're the same once serialized.
///
/// # Arguments
/// * `outcome` - The handshake.
/// * `c_ours` - The connection identifier we chose.
/// * `c_theirs` - The connection identifier the peer chose.
pub fn derive<E: Exporter + ?Sized>(
    outcome: HandshakeOutcome<E>,
    c_ours: &ConnectionId,
    c_theirs: &ConnectionId,
) -> Result<EdhocSecurityContext> {
    let HandshakeOutcome {
        exporter,
        pending_message,
    } = outcome;
    let suite = exporter.selected_cipher_suite();
    let (aead, hash) = algorithms_for_suite(suite)?;

    let master_secret =
        exporter.edhoc_exporter(LABEL_MASTER_SECRET, &[], aead.key_len())?;
    let master_salt =
        exporter.edhoc_exporter(LABEL_MASTER_SALT, &[], MASTER_SALT_LEN)?;

    let sender_id = c_theirs.to_oscore_id()?;
    let recipient_id = c_ours.to_oscore_id()?;
    if sender_id == recipient_id {
        return Err(Error::IdentifierCollision(sender_id));
    }
    debug!(
        suite,
        sender_id = %hex::encode(&sender_id),
        recipient_id = %hex::encode(&recipient_id),
        "Deriving OSCORE context"
    );

    let context = SecurityContext::derive_keys(Parameters {
        master_secret,
        master_salt,
        sender_id,
        recipient_id,
        id_context: None,
        aead,
        hash,
        replay_window_size: REPLAY_WINDOW_SIZE,
    })?;

    Ok(EdhocSecurityContext::new(context, pending_message))
}
