use async_trait::async_trait;
use coap_lite::Packet;
use core::fmt;
use parking_lot::RwLock;
use std::{collections::HashMap, error, sync::Arc};
use tracing::debug;

use super::{piggyback::EdhocSecurityContext, Result};

/// What can go wrong getting a message to the other side and an answer back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response arrived in time.
    Timeout,
    /// The destination can't be reached.
    Unreachable(String),
    /// Any other failure of the underlying transport.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Timeout => {
                write!(f, "Timed out waiting for response")
            }
            TransportError::Unreachable(dest) => {
                write!(f, "Destination {} unreachable", dest)
            }
            TransportError::Other(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl error::Error for TransportError {}

/// Sends a CoAP request and returns the response.
///
/// Implementations take care of retransmission and matching responses to
/// requests, none of that happens in this crate.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        request: Packet,
    ) -> core::result::Result<Packet, TransportError>;
}

/// A `Transport` that protects requests with OSCORE, using the context that
/// is registered for their destination.
pub struct SecureTransport<T> {
    inner: T,
    contexts: RwLock<HashMap<String, Arc<EdhocSecurityContext>>>,
}

impl<T: Transport> SecureTransport<T> {
    pub fn new(inner: T) -> SecureTransport<T> {
        SecureTransport {
            inner,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Uses `context` for everything sent to `destination` from now on,
    /// returning the context it replaces.
    pub fn register_context_for_destination(
        &self,
        destination: impl Into<String>,
        context: Arc<EdhocSecurityContext>,
    ) -> Option<Arc<EdhocSecurityContext>> {
        let destination = destination.into();
        debug!(
            %destination,
            sender_id = %hex::encode(context.sender_id()),
            "Registered security context"
        );
        self.contexts.write().insert(destination, context)
    }

    /// Removes the context for `destination`.
    pub fn forget_destination(
        &self,
        destination: &str,
    ) -> Option<Arc<EdhocSecurityContext>> {
        self.contexts.write().remove(destination)
    }

    /// Returns the context registered for `destination`.
    pub fn context_for(
        &self,
        destination: &str,
    ) -> Option<Arc<EdhocSecurityContext>> {
        self.contexts.read().get(destination).cloned()
    }

    /// Sends the request as it is, without OSCORE.
    pub async fn send_plain(
        &self,
        destination: &str,
        request: Packet,
    ) -> core::result::Result<Packet, TransportError> {
        self.inner.send(destination, request).await
    }

    /// Sends the request, protected with the context registered for
    /// `destination`, and returns the unprotected response.
    ///
    /// Destinations without a context get the request unprotected.
    pub async fn send(
        &self,
        destination: &str,
        request: Packet,
    ) -> Result<Packet> {
        let context = match self.context_for(destination) {
            Some(context) => context,
            None => return Ok(self.send_plain(destination, request).await?),
        };

        let (protected, request_id) = context.protect(request)?;
        let response = self.inner.send(destination, protected).await?;

        context.unprotect_response(response, &request_id)
    }
}

#[cfg(test)]
mod tests {
    use coap_lite::{CoapOption, MessageClass, RequestType, ResponseType};

    use super::super::mock::{MockInitiator, MockResponder, RESPONDER};
    use super::super::{
        derive::{derive, HandshakeOutcome},
        Error,
    };
    use super::*;
    use crate::{
        edhoc::{ConnectionId, EDHOC_OPTION},
        oscore::has_option,
    };

    fn get(path: &str) -> Packet {
        let mut packet = Packet::new();
        packet.header.code = MessageClass::Request(RequestType::Get);
        packet.add_option(CoapOption::UriPath, path.as_bytes().to_vec());
        packet
    }

    fn context(initiator: &mut MockInitiator) -> Arc<EdhocSecurityContext> {
        let message_3 = initiator.message_3.clone();
        Arc::new(
            derive(
                HandshakeOutcome {
                    exporter: initiator,
                    pending_message: Some(message_3),
                },
                &ConnectionId::Int(8),
                &ConnectionId::Int(-1),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn protected_exchange() {
        let mut initiator = MockInitiator::default();
        let responder = MockResponder::new(&initiator);
        let transport = SecureTransport::new(responder);
        transport.register_context_for_destination(
            RESPONDER,
            context(&mut initiator),
        );

        for _ in 0..3 {
            let response =
                transport.send(RESPONDER, get("temp")).await.unwrap();
            assert_eq!(
                MessageClass::Response(ResponseType::Content),
                response.header.code
            );
            assert_eq!(b"temp".to_vec(), response.payload);
        }

        let received = transport.inner().received();
        assert_eq!(3, received.len());
        // message_3 only came with the first request
        assert_eq!(Some(initiator.message_3.clone()), received[0].0);
        assert!(received[1..].iter().all(|(m, _)| m.is_none()));
        assert_eq!(
            MessageClass::Request(RequestType::Get),
            received[2].1.header.code
        );
    }

    #[tokio::test]
    async fn plain_without_context() {
        let initiator = MockInitiator::default();
        let transport = SecureTransport::new(MockResponder::new(&initiator));

        // The responder echoes the path of unprotected requests too
        let response = transport.send(RESPONDER, get("hello")).await.unwrap();
        assert_eq!(b"hello".to_vec(), response.payload);
        assert!(!has_option(&response, CoapOption::Oscore));
        assert!(transport.context_for(RESPONDER).is_none());
    }

    #[tokio::test]
    async fn registration() {
        let mut initiator = MockInitiator::default();
        let transport = SecureTransport::new(MockResponder::new(&initiator));
        let first = context(&mut initiator);
        let second = context(&mut initiator);

        assert!(transport
            .register_context_for_destination(RESPONDER, first.clone())
            .is_none());
        let replaced = transport
            .register_context_for_destination(RESPONDER, second.clone())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &replaced));
        assert!(Arc::ptr_eq(
            &second,
            &transport.context_for(RESPONDER).unwrap()
        ));

        assert!(transport.forget_destination(RESPONDER).is_some());
        assert!(transport.context_for(RESPONDER).is_none());
        assert!(transport.forget_destination(RESPONDER).is_none());
    }

    #[tokio::test]
    async fn transport_failure() {
        let mut initiator = MockInitiator::default();
        let transport = SecureTransport::new(MockResponder::new(&initiator));
        transport.register_context_for_destination(
            "coap://elsewhere",
            context(&mut initiator),
        );

        match transport.send("coap://elsewhere", get("temp")).await {
            Err(Error::Transport(TransportError::Unreachable(_))) => {}
            _ => panic!("Mock only knows one destination"),
        }
        // The request was protected before it failed, message_3 is gone
        let context = transport.context_for("coap://elsewhere").unwrap();
        assert!(!context.has_pending_message());
        let (protected, _) = context.protect(get("temp")).unwrap();
        assert!(!has_option(
            &protected,
            CoapOption::Unknown(EDHOC_OPTION)
        ));
    }
}
