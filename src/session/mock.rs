//! Test doubles for both sides of a handshake.

use async_trait::async_trait;
use coap_lite::{CoapOption, MessageClass, Packet, ResponseType};
use core::time::Duration;
use parking_lot::Mutex;
use serde_bytes::Bytes;

use super::{
    piggyback::split_combined_request, transport::Transport, TransportError,
};
use crate::{
    cbor,
    edhoc::{
        ConnectionId, CredentialTransfer, EadItem, EdhocError, Exporter,
        Initiator, Message2Info, Result, SUITE_2,
    },
    oscore::{has_option, Parameters, SecurityContext},
};

pub const RESPONDER: &str = "coap://responder";

/// CCS of the responder, with kid `0x0A`.
pub const CRED_R: &str = "A2026008A101A5010202410A2001215820BBC34960526EA4D32E940CAD2A234148DDC21791A12AFBCBAC93622046DD44F02258204519E257236B2A0CE2023F0931F1F386CA7AFDA64FCDE0108C224C51EABF6072";

/// An initiator that doesn't compute anything, it just plays back what it's
/// told to and records how it's used.
pub struct MockInitiator {
    pub suite: i32,
    pub c_r: ConnectionId,
    pub id_cred_r: Vec<u8>,
    pub ead_2: Option<EadItem>,
    pub master_secret: Vec<u8>,
    pub master_salt: Vec<u8>,
    pub message_3: Vec<u8>,
    pub verification_fails: bool,
    pub exporter_fails: bool,
    pub exporter_calls: Vec<(u8, Vec<u8>, usize)>,
    pub verified_against: Option<Vec<u8>>,
    pub transfer: Option<CredentialTransfer>,
}

impl Default for MockInitiator {
    fn default() -> MockInitiator {
        MockInitiator {
            suite: SUITE_2,
            c_r: ConnectionId::Int(-1),
            id_cred_r: vec![0x0A],
            ead_2: None,
            master_secret: (0x10..0x20).collect(),
            master_salt: vec![0xAA; 8],
            message_3: cbor::encode(Bytes::new(&[0xC0; 32])).unwrap(),
            verification_fails: false,
            exporter_fails: false,
            exporter_calls: Vec::new(),
            verified_against: None,
            transfer: None,
        }
    }
}

impl Exporter for MockInitiator {
    fn selected_cipher_suite(&self) -> i32 {
        self.suite
    }

    fn edhoc_exporter(
        &mut self,
        label: u8,
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>> {
        self.exporter_calls.push((label, context.to_vec(), length));
        if self.exporter_fails {
            return Err(EdhocError::Engine("PRK_exporter missing".into()));
        }
        let source = match label {
            0 => &self.master_secret,
            1 => &self.master_salt,
            _ => return Err(EdhocError::Engine("Unknown label".into())),
        };

        Ok(source.iter().cycle().take(length).cloned().collect())
    }
}

impl Initiator for MockInitiator {
    fn prepare_first_message(&mut self, c_i: &ConnectionId) -> Result<Vec<u8>> {
        // METHOD, SUITES_I, G_X, C_I with a short fake G_X
        let mut message_1 = vec![0x03, 0x02, 0x43, 0x01, 0x02, 0x03];
        message_1.extend(c_i.to_oscore_id()?);
        Ok(message_1)
    }

    fn parse_second_message(
        &mut self,
        message_2: &[u8],
    ) -> Result<Message2Info> {
        cbor::bstr_len(message_2)?;
        Ok(Message2Info {
            c_r: self.c_r.clone(),
            id_cred_r: self.id_cred_r.clone(),
            ead_2: self.ead_2.clone(),
        })
    }

    fn verify_peer(
        &mut self,
        _identity: &[u8],
        _credential: &[u8],
        peer_credential: &[u8],
    ) -> Result<()> {
        self.verified_against = Some(peer_credential.to_vec());
        if self.verification_fails {
            Err(EdhocError::Engine("MAC_2 mismatch".into()))
        } else {
            Ok(())
        }
    }

    fn prepare_final_message(
        &mut self,
        transfer: CredentialTransfer,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.transfer = Some(transfer);
        Ok((self.message_3.clone(), vec![0x77; 32]))
    }
}

/// A responder at `RESPONDER`, answering `message_1` with `message_2` and
/// serving OSCORE requests once it got `message_3`.
///
/// Every request that isn't `message_1` has its path echoed back as the
/// response payload.
pub struct MockResponder {
    pub message_2: Vec<u8>,
    pub delay: Option<Duration>,
    params: Parameters,
    server: Mutex<Option<SecurityContext>>,
    received: Mutex<Vec<(Option<Vec<u8>>, Packet)>>,
}

impl MockResponder {
    /// Creates the responder matching the initiator, assuming `C_I` is 8.
    pub fn new(initiator: &MockInitiator) -> MockResponder {
        let params = Parameters::new(
            initiator.master_secret.clone(),
            initiator.master_salt.clone(),
            vec![0x08],
            initiator.c_r.to_oscore_id().unwrap(),
        );

        MockResponder {
            message_2: cbor::encode(Bytes::new(&[0x42; 24])).unwrap(),
            delay: None,
            params,
            server: Mutex::new(None),
            received: Mutex::new(Vec::new()),
        }
    }

    /// The unprotected requests, with the `message_3` they came with.
    pub fn received(&self) -> Vec<(Option<Vec<u8>>, Packet)> {
        self.received.lock().clone()
    }

    fn respond(&self, request: Packet) -> Packet {
        let (message_3, request) = split_combined_request(request).unwrap();
        let mut server = self.server.lock();
        if message_3.is_some() {
            let context = SecurityContext::derive_keys(self.params.clone());
            *server = Some(context.unwrap());
        }

        let mut response = Packet::new();
        response.header.code = MessageClass::Response(ResponseType::Content);
        response.set_token(request.get_token().clone());

        if !has_option(&request, CoapOption::Oscore) {
            response.payload = path(&request);
            self.received.lock().push((message_3, request));
            return response;
        }
        let server = match server.as_mut() {
            Some(server) => server,
            None => {
                response.header.code =
                    MessageClass::Response(ResponseType::Unauthorized);
                return response;
            }
        };
        let (request, request_id) = server.unprotect_request(request).unwrap();
        response.payload = path(&request);
        self.received.lock().push((message_3, request));

        server.protect_response(response, &request_id, true).unwrap()
    }
}

fn path(request: &Packet) -> Vec<u8> {
    request
        .get_option(CoapOption::UriPath)
        .and_then(|p| p.back().cloned())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for MockResponder {
    async fn send(
        &self,
        destination: &str,
        request: Packet,
    ) -> core::result::Result<Packet, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if destination != RESPONDER {
            return Err(TransportError::Unreachable(destination.to_string()));
        }
        // Go through the bytes like a real transport
        let request = Packet::from_bytes(
            &request
                .to_bytes()
                .map_err(|e| TransportError::Other(format!("{:?}", e)))?,
        )
        .map_err(|e| TransportError::Other(format!("{:?}", e)))?;

        let is_message_1 = !has_option(&request, CoapOption::Oscore)
            && request.payload.first() == Some(&0xF5);
        if is_message_1 {
            let mut response = Packet::new();
            response.header.code =
                MessageClass::Response(ResponseType::Changed);
            response.payload = self.message_2.clone();
            return Ok(response);
        }

        Ok(self.respond(request))
    }
}
