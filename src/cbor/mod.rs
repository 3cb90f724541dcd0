//! Helpful functionality around the `serde_cbor` crate.

use serde::Serialize;
use serde_cbor::{de, Value};

#[cfg_attr(tarpaulin, skip)]
mod error;
pub use error::CborError;

/// The result type for the `cbor` module.
pub type Result<T> = core::result::Result<T, CborError>;

/// Serializes an object into CBOR.
pub fn encode(object: impl Serialize) -> Result<Vec<u8>> {
    serialize(object, 0)
}

/// Serializes an object into a sequence of CBOR encoded data items.
///
/// Only works for objects that serialize to a CBOR array of at most 23 items.
pub fn encode_sequence(object: impl Serialize) -> Result<Vec<u8>> {
    // The object encodes as an array. Dropping the first byte (major type and
    // length) leaves the bare items, as long as the length fit in that byte.
    serialize(object, 1)
}

/// Serializes an object, returning its bytes from an offset.
fn serialize(object: impl Serialize, offset: usize) -> Result<Vec<u8>> {
    let mut bytes = serde_cbor::to_vec(&object)?;
    bytes.drain(..offset);

    Ok(bytes)
}

/// Deserializes a sequence of CBOR encoded data items into an object.
///
/// Requires a `Vec<u8>` of length `bytes` + 1 to use as a buffer and only
/// works for sequences of at most 23 items.
///
/// # Arguments
/// * `bytes` - The sequence of CBOR items.
/// * `n_items` - The number of items.
/// * `tmp_vec` - Buffer used for deserialization.
pub fn decode_sequence<'a, T>(
    bytes: &[u8],
    n_items: usize,
    tmp_vec: &'a mut Vec<u8>,
) -> Result<T>
where
    T: serde::Deserialize<'a>,
{
    // Turn the sequence into an array by prepending the array header
    tmp_vec.push(array_byte(n_items)?);
    tmp_vec.extend(bytes);

    Ok(de::from_mut_slice(tmp_vec)?)
}

/// Decodes a single CBOR item into a generic `Value`.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    Ok(de::from_slice(bytes)?)
}

/// Walks down nested maps with integer keys and returns the byte string at
/// the end of the path, if there is one.
///
/// For a CCS, the path `[8, 1, 2]` leads through `cnf` and `COSE_Key` to the
/// `kid`.
pub fn nested_bytes<'a>(value: &'a Value, path: &[i128]) -> Option<&'a [u8]> {
    let mut current = value;
    for key in path {
        current = match current {
            Value::Map(map) => map.get(&Value::Integer(*key))?,
            _ => return None,
        };
    }

    match current {
        Value::Bytes(bytes) => Some(bytes),
        _ => None,
    }
}

/// Returns the number of bytes taken up by the byte string at the start of
/// `bytes`, header included.
///
/// Only definite-length byte strings are supported.
pub fn bstr_len(bytes: &[u8]) -> Result<usize> {
    let initial = *bytes.first().ok_or(CborError::Truncated)?;
    // The three leftmost bits are the major type, 2 being a byte string
    if initial >> 5 != 2 {
        return Err(CborError::UnexpectedItem);
    }
    // The remaining bits either hold the length directly, or tell how many of
    // the following bytes do
    let (header_len, content_len) = match initial & 0b000_11111 {
        n @ 0..=23 => (1, u64::from(n)),
        n @ 24..=27 => {
            let width: usize = 1 << (n - 24);
            let len_bytes =
                bytes.get(1..=width).ok_or(CborError::Truncated)?;
            let content_len = len_bytes
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            (1 + width, content_len)
        }
        _ => return Err(CborError::UnexpectedItem),
    };

    let total = (header_len as u64)
        .checked_add(content_len)
        .ok_or(CborError::Truncated)?;
    if total > bytes.len() as u64 {
        return Err(CborError::Truncated);
    }

    Ok(total as usize)
}

/// Returns the byte indicating the CBOR array type with the given number of
/// elements.
fn array_byte(n: usize) -> Result<u8> {
    match n {
        _ if n > 23 => Err(CborError::TooManyItems),
        // Major type 4 in the three leftmost bits, the count in the others
        n => Ok(0b100_00000 | n as u8),
    }
}
