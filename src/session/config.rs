use core::time::Duration;
use serde::{Deserialize, Deserializer};

use crate::edhoc::{ConnectionId, CredentialTransfer};

/// How the initiator runs a handshake.
///
/// Everything has a default, so deserializing only needs to mention what
/// differs. Durations are given in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InitiatorConfig {
    /// Our connection identifier, `C_I`.
    pub connection_id: ConnectionId,
    /// How long to wait for any response from the responder.
    #[serde(deserialize_with = "seconds")]
    pub response_timeout: Duration,
    /// How our credential is sent in `message_3`.
    pub credential_transfer: CredentialTransfer,
    /// Where the responder accepts EDHOC messages.
    pub edhoc_path: String,
    /// Our private authentication key.
    #[serde(with = "serde_bytes")]
    pub identity: Vec<u8>,
    /// Our credential, `CRED_I`.
    #[serde(with = "serde_bytes")]
    pub credential: Vec<u8>,
}

impl Default for InitiatorConfig {
    fn default() -> InitiatorConfig {
        InitiatorConfig {
            connection_id: ConnectionId::Int(8),
            response_timeout: Duration::from_secs(10),
            credential_transfer: CredentialTransfer::ByReference,
            edhoc_path: ".well-known/edhoc".to_string(),
            identity: Vec::new(),
            credential: Vec::new(),
        }
    }
}

impl InitiatorConfig {
    pub fn new(identity: Vec<u8>, credential: Vec<u8>) -> InitiatorConfig {
        InitiatorConfig {
            identity,
            credential,
            ..InitiatorConfig::default()
        }
    }

    pub fn with_connection_id(mut self, c_i: ConnectionId) -> Self {
        self.connection_id = c_i;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_credential_transfer(
        mut self,
        transfer: CredentialTransfer,
    ) -> Self {
        self.credential_transfer = transfer;
        self
    }

    pub fn with_edhoc_path(mut self, path: impl Into<String>) -> Self {
        self.edhoc_path = path.into();
        self
    }
}

fn seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Duration, D::Error> {
    Ok(Duration::from_secs(u64::deserialize(deserializer)?))
}
