use coap_lite::{CoapOption, MessageClass, Packet, RequestType};
use core::future::Future;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, info, warn};

use super::{
    config::InitiatorConfig,
    derive::{derive, HandshakeOutcome},
    error::Error,
    piggyback::EdhocSecurityContext,
    transport::{SecureTransport, Transport, TransportError},
    Result,
};
use crate::{
    edhoc::{self, Initiator},
    registry::CredentialRegistry,
};

/// Where a handshake is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing sent yet.
    Start,
    /// `message_1` is on its way.
    Sent1,
    /// `message_2` arrived.
    Received2,
    /// The responder is who it claims to be.
    Verified,
    /// The OSCORE context is derived.
    ContextReady,
    /// The first request went out, with `message_3`.
    FirstRequestSent,
    /// The response to the first request arrived, the context is usable.
    Established,
    /// Something went wrong, nothing was kept.
    Aborted,
}

/// An established session.
pub struct Session {
    /// The context, which is also registered with the transport.
    pub context: Arc<EdhocSecurityContext>,
    /// The unprotected response to the first request.
    pub response: Packet,
}

/// The initiator side of a single EDHOC handshake leading to OSCORE.
pub struct Handshake<'a, I, T> {
    initiator: I,
    registry: &'a CredentialRegistry,
    transport: &'a SecureTransport<T>,
    config: &'a InitiatorConfig,
    state: State,
}

impl<'a, I: Initiator, T: Transport> Handshake<'a, I, T> {
    /// Prepares a handshake, without sending anything yet.
    pub fn new(
        initiator: I,
        registry: &'a CredentialRegistry,
        transport: &'a SecureTransport<T>,
        config: &'a InitiatorConfig,
    ) -> Handshake<'a, I, T> {
        Handshake {
            initiator,
            registry,
            transport,
            config,
            state: State::Start,
        }
    }

    /// The state the handshake is in.
    pub fn state(&self) -> State {
        self.state
    }

    /// Gives back the EDHOC implementation, for whatever comes after the
    /// handshake.
    pub fn into_initiator(self) -> I {
        self.initiator
    }

    /// Runs the handshake with `destination` and sends `first_request` over
    /// the resulting OSCORE context, together with `message_3`.
    ///
    /// On success, the context is registered with the transport for
    /// `destination`. On failure, nothing is.
    pub async fn run(
        &mut self,
        destination: &str,
        first_request: Packet,
    ) -> Result<Session> {
        match self.advance(destination, first_request).await {
            Ok(session) => {
                self.transition(State::Established);
                info!(
                    %destination,
                    sender_id = %hex::encode(session.context.sender_id()),
                    recipient_id = %hex::encode(session.context.recipient_id()),
                    "OSCORE session established"
                );
                Ok(session)
            }
            Err(e) => {
                warn!(
                    %destination,
                    state = ?self.state,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Handshake aborted"
                );
                self.state = State::Aborted;
                Err(e)
            }
        }
    }

    async fn advance(
        &mut self,
        destination: &str,
        first_request: Packet,
    ) -> Result<Session> {
        // message_1
        let message_1 = self
            .initiator
            .prepare_first_message(&self.config.connection_id)?;
        let request = self.edhoc_request(edhoc::message_1_payload(&message_1)?);
        self.transition(State::Sent1);
        let response = self
            .bounded(self.transport.send_plain(destination, request))
            .await?;

        // message_2
        let message_2 = response.payload;
        edhoc::fail_on_error_message(&message_2)?;
        let info = self.initiator.parse_second_message(&message_2)?;
        self.transition(State::Received2);
        if let Some(ead) = &info.ead_2 {
            if ead.is_critical() {
                return Err(Error::CriticalEad(ead.label));
            }
            debug!(label = ead.label, "Ignoring non-critical EAD item");
        }

        let peer = self
            .registry
            .lookup(&info.id_cred_r)
            .ok_or_else(|| Error::UnknownPeer(info.id_cred_r.clone()))?;
        self.initiator
            .verify_peer(
                &self.config.identity,
                &self.config.credential,
                peer.as_bytes(),
            )
            .map_err(Error::AuthenticationFailed)?;
        self.transition(State::Verified);

        // message_3 and the context
        let (message_3, _prk_out) = self
            .initiator
            .prepare_final_message(self.config.credential_transfer)?;
        let context = derive(
            HandshakeOutcome {
                exporter: &mut self.initiator,
                pending_message: Some(message_3),
            },
            &self.config.connection_id,
            &info.c_r,
        )?;
        let context = Arc::new(context);
        self.transition(State::ContextReady);

        self.transport
            .register_context_for_destination(destination, context.clone());
        match self.first_exchange(destination, &context, first_request).await
        {
            Ok(response) => Ok(Session { context, response }),
            Err(e) => {
                self.transport.forget_destination(destination);
                Err(e)
            }
        }
    }

    async fn first_exchange(
        &mut self,
        destination: &str,
        context: &EdhocSecurityContext,
        request: Packet,
    ) -> Result<Packet> {
        let (protected, request_id) = context.protect(request)?;
        self.transition(State::FirstRequestSent);
        let response = self
            .bounded(self.transport.send_plain(destination, protected))
            .await?;

        context.unprotect_response(response, &request_id)
    }

    /// Returns the POST request carrying an EDHOC message.
    fn edhoc_request(&self, payload: Vec<u8>) -> Packet {
        let mut request = Packet::new();
        request.header.code = MessageClass::Request(RequestType::Post);
        let segments =
            self.config.edhoc_path.split('/').filter(|s| !s.is_empty());
        for segment in segments {
            request
                .add_option(CoapOption::UriPath, segment.as_bytes().to_vec());
        }
        request.payload = payload;

        request
    }

    /// Waits for the transport, but no longer than the configured timeout.
    async fn bounded(
        &self,
        exchange: impl Future<
            Output = core::result::Result<Packet, TransportError>,
        >,
    ) -> Result<Packet> {
        match time::timeout(self.config.response_timeout, exchange).await {
            Ok(response) => Ok(response?),
            Err(_) => Err(TransportError::Timeout.into()),
        }
    }

    fn transition(&mut self, next: State) {
        debug!(from = ?self.state, to = ?next, "Handshake state change");
        self.state = next;
    }
}
