use coap_lite::{CoapOption, MessageClass, Packet, RequestType, ResponseType};

use super::{
    algorithm::{AeadAlgorithm, HashFunction},
    error::Error,
    replay::ReplayWindow,
    util, Result,
};
use crate::edhoc::EDHOC_OPTION;

/// The inputs to the key schedule of a security context.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub master_secret: Vec<u8>,
    pub master_salt: Vec<u8>,
    pub sender_id: Vec<u8>,
    pub recipient_id: Vec<u8>,
    pub id_context: Option<Vec<u8>>,
    pub aead: AeadAlgorithm,
    pub hash: HashFunction,
    pub replay_window_size: u32,
}

impl Parameters {
    /// Returns parameters with the RFC 8613 defaults for everything but
    /// the secret, salt and identifiers.
    pub fn new(
        master_secret: Vec<u8>,
        master_salt: Vec<u8>,
        sender_id: Vec<u8>,
        recipient_id: Vec<u8>,
    ) -> Parameters {
        Parameters {
            master_secret,
            master_salt,
            sender_id,
            recipient_id,
            id_context: None,
            aead: AeadAlgorithm::AesCcm16_64_128,
            hash: HashFunction::Sha256,
            replay_window_size: 32,
        }
    }
}

/// Identifies a request, so the response to it can be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId {
    kid: Vec<u8>,
    piv: Vec<u8>,
}

impl RequestId {
    /// The sender ID of the endpoint that sent the request.
    pub fn kid(&self) -> &[u8] {
        &self.kid
    }

    /// The partial IV of the request.
    pub fn piv(&self) -> &[u8] {
        &self.piv
    }

    /// The sequence number the request was sent with.
    pub fn sequence_number(&self) -> u64 {
        util::piv_to_u64(&self.piv)
    }
}

/// The common context part of the security context.
struct CommonContext {
    // Master secret and salt only live as long as the key schedule
    aead: AeadAlgorithm,
    hash: HashFunction,
    id_context: Option<Vec<u8>>,
    common_iv: Vec<u8>,
}

/// The sender context part of the security context.
struct SenderContext {
    sender_id: Vec<u8>,
    sender_key: Vec<u8>,
    sender_sequence_number: u64,
}

/// The recipient context part of the security context.
struct RecipientContext {
    recipient_id: Vec<u8>,
    recipient_key: Vec<u8>,
    replay_window: ReplayWindow,
}

/// The security context.
pub struct SecurityContext {
    common_context: CommonContext,
    sender_context: SenderContext,
    recipient_context: RecipientContext,
}

/// The known class U options that have to remain public.
static CLASS_U: [CoapOption; 5] = [
    CoapOption::UriHost,
    CoapOption::UriPort,
    CoapOption::ProxyUri,
    CoapOption::ProxyScheme,
    CoapOption::Unknown(EDHOC_OPTION),
];
/// The optional options that we don't support.
static UNSUPPORTED: [CoapOption; 6] = [
    CoapOption::Observe,
    CoapOption::Block2,
    CoapOption::Block1,
    CoapOption::Size2,
    CoapOption::Size1,
    CoapOption::NoResponse,
];

impl SecurityContext {
    /// Creates a new `SecurityContext` with AES-CCM-16-64-128, SHA-256, no
    /// ID Context and a replay window of 32.
    pub fn new(
        master_secret: Vec<u8>,
        master_salt: Vec<u8>,
        sender_id: Vec<u8>,
        recipient_id: Vec<u8>,
    ) -> Result<SecurityContext> {
        SecurityContext::derive_keys(Parameters::new(
            master_secret,
            master_salt,
            sender_id,
            recipient_id,
        ))
    }

    /// Runs the key schedule and creates a `SecurityContext` starting at
    /// sequence number 0 with an empty replay window.
    ///
    /// Fails if an ID is longer than the nonce length minus 6 bytes.
    pub fn derive_keys(params: Parameters) -> Result<SecurityContext> {
        let Parameters {
            master_secret,
            master_salt,
            sender_id,
            recipient_id,
            id_context,
            aead,
            hash,
            replay_window_size,
        } = params;
        let key_len = aead.key_len();
        let nonce_len = aead.nonce_len();
        for id in &[&sender_id, &recipient_id] {
            if id.len() > nonce_len - 6 {
                return Err(Error::IdTooLong(id.to_vec()));
            }
        }

        let derive = |id: &[u8], r#type: &str, l: usize| -> Result<Vec<u8>> {
            let info =
                util::build_info(id, id_context.as_deref(), aead, r#type, l)?;
            hash.hkdf(&master_salt, &master_secret, &info, l)
        };
        let sender_key = derive(&sender_id, "Key", key_len)?;
        let recipient_key = derive(&recipient_id, "Key", key_len)?;
        let common_iv = derive(&[], "IV", nonce_len)?;

        Ok(SecurityContext {
            common_context: CommonContext {
                aead,
                hash,
                id_context,
                common_iv,
            },
            sender_context: SenderContext {
                sender_id,
                sender_key,
                sender_sequence_number: 0,
            },
            recipient_context: RecipientContext {
                recipient_id,
                recipient_key,
                replay_window: ReplayWindow::new(replay_window_size),
            },
        })
    }

    pub fn sender_id(&self) -> &[u8] {
        &self.sender_context.sender_id
    }

    pub fn recipient_id(&self) -> &[u8] {
        &self.recipient_context.recipient_id
    }

    pub fn id_context(&self) -> Option<&[u8]> {
        self.common_context.id_context.as_deref()
    }

    pub fn aead(&self) -> AeadAlgorithm {
        self.common_context.aead
    }

    pub fn hash(&self) -> HashFunction {
        self.common_context.hash
    }

    /// The sequence number the next message we protect will use.
    pub fn sender_sequence_number(&self) -> u64 {
        self.sender_context.sender_sequence_number
    }

    pub fn replay_window(&self) -> &ReplayWindow {
        &self.recipient_context.replay_window
    }

    /// Returns the OSCORE message protecting the CoAP request, along with
    /// what's needed to unprotect the response.
    ///
    /// # Arguments
    /// * `request` - The original CoAP request to protect.
    pub fn protect_request(
        &mut self,
        request: Packet,
    ) -> Result<(Packet, RequestId)> {
        let piv = self.next_piv()?;
        let kid = self.sender_context.sender_id.clone();

        let aad = util::build_aad(self.aead(), &kid, &piv)?;
        let nonce = util::compute_nonce(
            &piv,
            &kid,
            &self.common_context.common_iv,
        );
        let option = util::build_oscore_option(Some(&kid), Some(&piv));

        let protected = self.protect_message(request, &aad, &nonce, option)?;
        // Only a successfully protected message uses up its sequence number
        self.sender_context.sender_sequence_number += 1;

        Ok((protected, RequestId { kid, piv }))
    }

    /// Returns the OSCORE message protecting the CoAP response.
    ///
    /// # Arguments
    /// * `response` - The original CoAP response to protect.
    /// * `request` - The request being responded to.
    /// * `reuse_piv` - Whether the request's `piv` should be reused. Otherwise
    ///   the own `sender_sequence_number` will be used.
    pub fn protect_response(
        &mut self,
        response: Packet,
        request: &RequestId,
        reuse_piv: bool,
    ) -> Result<Packet> {
        let aad = util::build_aad(self.aead(), &request.kid, &request.piv)?;

        if reuse_piv {
            // Same nonce as the request, nothing to tell the other side
            let nonce = util::compute_nonce(
                &request.piv,
                &self.recipient_context.recipient_id,
                &self.common_context.common_iv,
            );
            let option = util::build_oscore_option(None, None);
            self.protect_message(response, &aad, &nonce, option)
        } else {
            let piv = self.next_piv()?;
            let nonce = util::compute_nonce(
                &piv,
                &self.sender_context.sender_id,
                &self.common_context.common_iv,
            );
            let option = util::build_oscore_option(None, Some(&piv));
            let protected =
                self.protect_message(response, &aad, &nonce, option)?;
            self.sender_context.sender_sequence_number += 1;
            Ok(protected)
        }
    }

    /// Returns the protected OSCORE message for the given parameters.
    ///
    /// # Arguments
    /// * `original` - The original CoAP message to protect.
    /// * `aad` - The AAD for the AEAD.
    /// * `nonce` - The AEAD nonce to use.
    /// * `option` - The value of the OSCORE option.
    fn protect_message(
        &self,
        mut original: Packet,
        aad: &[u8],
        nonce: &[u8],
        option: Vec<u8>,
    ) -> Result<Packet> {
        let mut inner = Packet::new();

        // The real code goes inside, the outer one only tells requests from
        // responses
        inner.header.code = original.header.code;
        original.header.code = match original.header.code {
            MessageClass::Response(_) => {
                MessageClass::Response(ResponseType::Changed)
            }
            _ => MessageClass::Request(RequestType::Post),
        };

        // Move class E (and unknown) options into the inner message
        let mut moved_options = vec![];
        for (number, value_list) in original.options() {
            let option = CoapOption::from(*number);
            if UNSUPPORTED.contains(&option) {
                return Err(Error::UnsupportedOption(option));
            }
            if CLASS_U.contains(&option) {
                continue;
            }
            inner.set_option(option, value_list.clone());
            moved_options.push(option);
        }
        for option in moved_options {
            original.clear_option(option);
        }

        inner.payload = std::mem::take(&mut original.payload);
        // The plaintext is the inner message without the first header byte,
        // the message ID and the token: code, options and payload
        let mut plaintext = inner.to_bytes()?;
        let tkl = inner.header.get_token_length();
        plaintext.drain(2..4 + tkl as usize);
        plaintext.remove(0);

        original.payload = self.aead().seal(
            &self.sender_context.sender_key,
            nonce,
            aad,
            &plaintext,
        )?;
        original.add_option(CoapOption::Oscore, option);

        Ok(original)
    }

    /// Returns the original CoAP request protected in the OSCORE message,
    /// along with what's needed to protect the response.
    ///
    /// # Arguments
    /// * `protected` - The OSCORE message protecting the CoAP request.
    pub fn unprotect_request(
        &mut self,
        protected: Packet,
    ) -> Result<(Packet, RequestId)> {
        let (kid, piv) = util::extract_kid_piv(&protected)?;
        // This is a request, so they need to be present
        let (kid, piv) =
            (kid.ok_or(Error::NoKidPiv)?, piv.ok_or(Error::NoKidPiv)?);
        let sequence_number = util::piv_to_u64(&piv);

        self.check_replay(sequence_number)?;

        let aad = util::build_aad(self.aead(), &kid, &piv)?;
        let nonce = util::compute_nonce(
            &piv,
            &self.recipient_context.recipient_id,
            &self.common_context.common_iv,
        );
        let request = self.unprotect_message(protected, &aad, &nonce)?;
        // Only now that it's verified, remember the sequence number
        self.recipient_context
            .replay_window
            .strike_out(sequence_number);

        Ok((request, RequestId { kid, piv }))
    }

    /// Returns the original CoAP response protected in the OSCORE message.
    ///
    /// # Arguments
    /// * `protected` - The OSCORE message protecting the CoAP response.
    /// * `request` - The request this is the response to.
    pub fn unprotect_response(
        &mut self,
        protected: Packet,
        request: &RequestId,
    ) -> Result<Packet> {
        let (_, response_piv) = util::extract_kid_piv(&protected)?;
        // The response either brings its own piv or reuses the request's
        let nonce = match &response_piv {
            Some(piv) => util::compute_nonce(
                piv,
                &self.recipient_context.recipient_id,
                &self.common_context.common_iv,
            ),
            None => util::compute_nonce(
                &request.piv,
                &self.sender_context.sender_id,
                &self.common_context.common_iv,
            ),
        };
        let aad = util::build_aad(self.aead(), &request.kid, &request.piv)?;

        self.unprotect_message(protected, &aad, &nonce)
    }

    /// Returns the original CoAP message protected in the OSCORE message.
    ///
    /// # Arguments
    /// * `original` - The OSCORE message protecting the CoAP message.
    /// * `aad` - The AAD for the AEAD.
    /// * `nonce` - The AEAD nonce to use.
    fn unprotect_message(
        &self,
        mut original: Packet,
        aad: &[u8],
        nonce: &[u8],
    ) -> Result<Packet> {
        // Outer class E options have no business being there, drop them
        let mut to_discard = vec![];
        for (number, _) in original.options() {
            let option = CoapOption::from(*number);
            if UNSUPPORTED.contains(&option) {
                return Err(Error::UnsupportedOption(option));
            }
            if !CLASS_U.contains(&option) {
                to_discard.push(option);
            }
        }
        for option in to_discard {
            original.clear_option(option);
        }

        let plaintext = self.aead().open(
            &self.recipient_context.recipient_key,
            nonce,
            aad,
            &original.payload,
        )?;
        let (code, rest) =
            plaintext.split_first().ok_or(Error::MalformedPlaintext)?;

        // Rebuild a parseable CoAP message around code, options and payload:
        // [ver_t_tkl, code, message_id, message_id]
        let mut inner_bytes = vec![0x40, *code, 0x00, 0x00];
        inner_bytes.extend_from_slice(rest);
        let inner = Packet::from_bytes(&inner_bytes)?;

        original.header.code = inner.header.code;
        for (number, value_list) in inner.options() {
            original.set_option(CoapOption::from(*number), value_list.clone());
        }
        original.payload = inner.payload;

        Ok(original)
    }

    /// Throws an error if the sequence number has been received before.
    #[cfg_attr(feature = "no_replay", allow(unused_variables))]
    fn check_replay(&self, sequence_number: u64) -> Result<()> {
        #[cfg(not(feature = "no_replay"))]
        {
            if !self.recipient_context.replay_window.is_valid(sequence_number)
            {
                return Err(Error::ReplayDetected);
            }
        }

        Ok(())
    }

    /// Returns the partial IV for the current sender sequence number, unless
    /// it is too large to be sent.
    fn next_piv(&self) -> Result<Vec<u8>> {
        match self.sender_context.sender_sequence_number {
            n if n > util::MAX_SEQUENCE_NUMBER => {
                Err(Error::SequenceNumberExhausted)
            }
            n => Ok(util::format_piv(n)),
        }
    }

    #[cfg(test)]
    pub fn set_sender_sequence_number(&mut self, n: u64) {
        self.sender_context.sender_sequence_number = n;
    }
}
