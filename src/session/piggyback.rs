use coap_lite::{CoapOption, Packet};
use parking_lot::Mutex;
use tracing::debug;

use super::Result;
use crate::{
    cbor,
    edhoc::EDHOC_OPTION,
    oscore::{has_option, RequestId, SecurityContext},
};

struct Inner {
    context: SecurityContext,
    pending_message_3: Option<Vec<u8>>,
}

/// An OSCORE security context established with EDHOC.
///
/// Until it's been sent, EDHOC `message_3` is carried by the first request
/// this context protects. After that, it behaves like the plain
/// `SecurityContext` it wraps.
///
/// All operations lock the context for their whole duration, so it can be
/// shared between tasks. No two requests ever get the same sequence number
/// and only one of them carries `message_3`.
pub struct EdhocSecurityContext {
    inner: Mutex<Inner>,
}

impl EdhocSecurityContext {
    /// Wraps `context`, attaching `message_3` to the first request if given.
    pub fn new(
        context: SecurityContext,
        message_3: Option<Vec<u8>>,
    ) -> EdhocSecurityContext {
        EdhocSecurityContext {
            inner: Mutex::new(Inner {
                context,
                pending_message_3: message_3,
            }),
        }
    }

    /// Protects the request, combining it with `message_3` if that is still
    /// pending.
    ///
    /// The combined request carries the EDHOC option and has `message_3`
    /// followed by the OSCORE ciphertext as its payload.
    pub fn protect(&self, request: Packet) -> Result<(Packet, RequestId)> {
        let mut inner = self.inner.lock();
        let (mut protected, request_id) =
            inner.context.protect_request(request)?;

        // Only reached when protection worked, so the message isn't lost
        if let Some(message_3) = inner.pending_message_3.take() {
            debug!(
                sequence_number = request_id.sequence_number(),
                message_3_len = message_3.len(),
                "Combining EDHOC message_3 with request"
            );
            protected
                .add_option(CoapOption::Unknown(EDHOC_OPTION), Vec::new());
            let mut payload = message_3;
            payload.extend_from_slice(&protected.payload);
            protected.payload = payload;
        }

        Ok((protected, request_id))
    }

    /// Returns the response to the request identified by `request`.
    pub fn unprotect_response(
        &self,
        response: Packet,
        request: &RequestId,
    ) -> Result<Packet> {
        Ok(self.inner.lock().context.unprotect_response(response, request)?)
    }

    /// Returns the request protected in the OSCORE message, for when we're
    /// the server.
    pub fn unprotect_request(
        &self,
        request: Packet,
    ) -> Result<(Packet, RequestId)> {
        Ok(self.inner.lock().context.unprotect_request(request)?)
    }

    /// Protects the response to a request we unprotected.
    pub fn protect_response(
        &self,
        response: Packet,
        request: &RequestId,
        reuse_piv: bool,
    ) -> Result<Packet> {
        Ok(self
            .inner
            .lock()
            .context
            .protect_response(response, request, reuse_piv)?)
    }

    /// Whether `message_3` still waits for the first request.
    pub fn has_pending_message(&self) -> bool {
        self.inner.lock().pending_message_3.is_some()
    }

    /// The ID we send with, the responder's connection identifier.
    pub fn sender_id(&self) -> Vec<u8> {
        self.inner.lock().context.sender_id().to_vec()
    }

    /// The ID we receive with, our own connection identifier.
    pub fn recipient_id(&self) -> Vec<u8> {
        self.inner.lock().context.recipient_id().to_vec()
    }

    /// The sequence number the next request will use.
    pub fn sender_sequence_number(&self) -> u64 {
        self.inner.lock().context.sender_sequence_number()
    }
}

/// Separates EDHOC `message_3` from the OSCORE request it was combined with.
///
/// Requests without the EDHOC option are returned as they are. Otherwise the
/// option is removed and the payload split after the byte string that opens
/// it, which is `message_3`.
pub fn split_combined_request(
    mut request: Packet,
) -> Result<(Option<Vec<u8>>, Packet)> {
    let option = CoapOption::Unknown(EDHOC_OPTION);
    if !has_option(&request, option) {
        return Ok((None, request));
    }
    request.clear_option(option);

    let boundary = cbor::bstr_len(&request.payload)?;
    let oscore_payload = request.payload.split_off(boundary);
    let message_3 = std::mem::replace(&mut request.payload, oscore_payload);

    Ok((Some(message_3), request))
}
