use super::{EdhocError, Result};
use crate::cbor;

/// The `ERR_CODE` for errors that only carry a diagnostic text.
const ERR_CODE_UNSPECIFIED: i32 = 1;

/// Returns the CoAP payload carrying `message_1`.
///
/// The initiator prepends the CBOR simple value `true` in place of a
/// connection identifier, telling the responder that this is a new exchange.
pub fn message_1_payload(message_1: &[u8]) -> Result<Vec<u8>> {
    let mut payload = cbor::encode(true)?;
    payload.extend_from_slice(message_1);

    Ok(payload)
}

/// Returns the bytes of an EDHOC error message with the given text.
pub fn build_error_message(err_msg: &str) -> Vec<u8> {
    // (ERR_CODE, ERR_INFO)
    let raw_msg = (ERR_CODE_UNSPECIFIED, err_msg);

    // Try to serialize the message. If we fail for some reason, return a
    // valid, pregenerated error message saying as much.
    cbor::encode_sequence(raw_msg).unwrap_or_else(|_| {
        vec![
            0x01, 0x78, 0x22, 0x45, 0x72, 0x72, 0x6F, 0x72, 0x20, 0x77, 0x68,
            0x69, 0x6C, 0x65, 0x20, 0x62, 0x75, 0x69, 0x6C, 0x64, 0x69, 0x6E,
            0x67, 0x20, 0x65, 0x72, 0x72, 0x6F, 0x72, 0x20, 0x6D, 0x65, 0x73,
            0x73, 0x61, 0x67, 0x65,
        ]
    })
}

/// Returns the code and diagnostic text of an EDHOC error message.
pub fn extract_error_message(msg: &[u8]) -> Result<(i32, String)> {
    let mut temp = Vec::with_capacity(msg.len() + 1);
    let (code, info): (i32, String) =
        cbor::decode_sequence(msg, 2, &mut temp)?;

    Ok((code, info))
}

/// Returns `EdhocError::PeerError` containing the error message, if the given
/// message was an EDHOC error message.
///
/// Use it by passing a received message to it, before trying to parse it.
pub fn fail_on_error_message(msg: &[u8]) -> Result<()> {
    match extract_error_message(msg) {
        Ok((code, info)) => Err(EdhocError::PeerError(code, info)),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_bytes::Bytes;

    use super::*;

    const SUITE_MSG: [u8; 27] = [
        0x01, 0x78, 0x18, 0x43, 0x69, 0x70, 0x68, 0x65, 0x72, 0x20, 0x73,
        0x75, 0x69, 0x74, 0x65, 0x20, 0x75, 0x6E, 0x73, 0x75, 0x70, 0x70,
        0x6F, 0x72, 0x74, 0x65, 0x64,
    ];

    #[test]
    fn message_1_framing() {
        let payload = message_1_payload(&[0x03, 0x02, 0x41, 0x08]).unwrap();
        assert_eq!(&[0xF5, 0x03, 0x02, 0x41, 0x08], &payload[..]);
    }

    #[test]
    fn error_message() {
        let bytes = build_error_message("Cipher suite unsupported");
        assert_eq!(&SUITE_MSG[..], &bytes[..]);
        assert_eq!(
            (1, "Cipher suite unsupported".to_string()),
            extract_error_message(&bytes).unwrap()
        );

        match fail_on_error_message(&bytes) {
            Err(EdhocError::PeerError(1, info)) => {
                assert_eq!("Cipher suite unsupported", info)
            }
            _ => panic!("Should have been recognized as an error message"),
        }
    }

    #[test]
    fn regular_message() {
        // message_2 is a single byte string, never an error message
        let message_2 = cbor::encode(Bytes::new(&[0x42; 40])).unwrap();
        assert!(fail_on_error_message(&message_2).is_ok());
        assert!(fail_on_error_message(&[]).is_ok());
    }
}
