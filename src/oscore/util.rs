use coap_lite::{CoapOption, Packet};
use serde_bytes::Bytes;

use super::{algorithm::AeadAlgorithm, error::Error, Result};
use crate::cbor;

/// The largest sequence number that fits into the 5 bytes of a partial IV.
pub const MAX_SEQUENCE_NUMBER: u64 = (1 << 40) - 1;

/// Returns the CBOR encoded `info` structure.
///
/// # Arguments
/// * `id` - The sender ID or recipient ID (or empty for IV).
/// * `id_context` - The ID Context, if there is one.
/// * `alg` - The AEAD algorithm of the context.
/// * `type` - Either "Key" or "IV".
/// * `l` - The size of the key/nonce for the AEAD, in bytes.
pub fn build_info(
    id: &[u8],
    id_context: Option<&[u8]>,
    alg: AeadAlgorithm,
    r#type: &str,
    l: usize,
) -> Result<Vec<u8>> {
    // (id, id_context, alg_aead, type, L)
    let info = (
        Bytes::new(id),
        id_context.map(Bytes::new),
        alg.cose_id(),
        r#type,
        l,
    );

    Ok(cbor::encode(info)?)
}

/// Returns the AAD, an `Encrypt0` structure wrapping the `aad_array`.
///
/// There's no argument for class I options, because the standard doesn't
/// define any at this point.
pub fn build_aad(
    alg: AeadAlgorithm,
    request_kid: &[u8],
    request_piv: &[u8],
) -> Result<Vec<u8>> {
    // (oscore_version, algorithms, request_kid, request_piv, options)
    let aad_arr = cbor::encode((
        1,
        [alg.cose_id()],
        Bytes::new(request_kid),
        Bytes::new(request_piv),
        Bytes::new(&[]),
    ))?;
    let aad = ("Encrypt0", Bytes::new(&[]), Bytes::new(&aad_arr));

    Ok(cbor::encode(aad)?)
}

/// Returns the value of the OSCORE option.
pub fn build_oscore_option(kid: Option<&[u8]>, piv: Option<&[u8]>) -> Vec<u8> {
    // Neither kid nor piv means the option is empty, not even a flag byte
    if kid.is_none() && piv.is_none() {
        return Vec::new();
    }

    let mut option = vec![0];
    if let Some(piv) = piv {
        // The partial IV length goes in the 3 least significant bits
        option[0] |= piv.len() as u8 & 0b0000_0111;
        option.extend_from_slice(piv);
    }
    if let Some(kid) = kid {
        option[0] |= 0b0000_1000;
        option.extend_from_slice(kid);
    }

    option
}

/// Whether the packet carries at least one value for the option.
///
/// `Packet::clear_option` leaves an empty entry behind, so the presence of a
/// key alone doesn't count.
pub fn has_option(packet: &Packet, option: CoapOption) -> bool {
    packet
        .get_option(option)
        .map_or(false, |values| !values.is_empty())
}

/// Returns the `kid` and `piv` values from the message, if present.
#[allow(clippy::type_complexity)]
pub fn extract_kid_piv(
    message: &Packet,
) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
    let option_value = message
        .get_option(CoapOption::Oscore)
        .ok_or(Error::NoOscoreOption)?
        .front()
        .ok_or(Error::NoOscoreOption)?;

    Ok(extract_oscore_option(option_value))
}

/// Returns the encoded `kid` and `piv` values from the option, if present.
fn extract_oscore_option(value: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    let flags = match value.first() {
        Some(flags) => *flags,
        None => return (None, None),
    };

    let piv_len = (flags & 0b0000_0111) as usize;
    let piv = match piv_len {
        0 => None,
        // Not enough data for the announced length
        n if value.len() <= n => return (None, None),
        n => Some(value[1..=n].to_vec()),
    };
    let kid = match flags & 0b0000_1000 {
        0 => None,
        _ => Some(value[1 + piv_len..].to_vec()),
    };

    (kid, piv)
}

/// Returns the nonce for the AEAD.
///
/// # Arguments
/// * `piv` - The partial IV.
/// * `id_piv` - The ID of the endpoint that generated the partial IV.
/// * `common_iv` - The Common IV, which is as long as the nonce.
pub fn compute_nonce(
    mut piv: &[u8],
    mut id_piv: &[u8],
    common_iv: &[u8],
) -> Vec<u8> {
    let nonce_len = common_iv.len();
    let max_id_len = nonce_len - 6;
    // Both could be longer than what fits, keep the low-order bytes
    if id_piv.len() > max_id_len {
        id_piv = &id_piv[id_piv.len() - max_id_len..];
    }
    if piv.len() > 5 {
        piv = &piv[piv.len() - 5..];
    }

    // Size of ID_PIV, ID_PIV left-padded to nonce length minus 6 and the
    // partial IV left-padded to 5 bytes
    let mut nonce = vec![0; nonce_len];
    nonce[0] = id_piv.len() as u8;
    nonce[nonce_len - 5 - id_piv.len()..nonce_len - 5].copy_from_slice(id_piv);
    nonce[nonce_len - piv.len()..].copy_from_slice(piv);
    for (b1, b2) in nonce.iter_mut().zip(common_iv.iter()) {
        *b1 ^= b2;
    }

    nonce
}

/// Returns the `piv` as a u64.
pub fn piv_to_u64(mut piv: &[u8]) -> u64 {
    if piv.len() > 8 {
        piv = &piv[piv.len() - 8..];
    }
    let mut piv_arr = [0; 8];
    piv_arr[8 - piv.len()..].copy_from_slice(piv);

    u64::from_be_bytes(piv_arr)
}

/// Returns the `piv` in its correct format (no leading zero bytes).
pub fn format_piv(piv: u64) -> Vec<u8> {
    let bytes = piv.to_be_bytes();
    match bytes.iter().position(|&x| x != 0) {
        Some(n) => bytes[n..].to_vec(),
        // Zero is still one byte
        None => vec![0x00],
    }
}
