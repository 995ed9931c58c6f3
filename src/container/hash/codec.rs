use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes `value` into the front of `buf`, zero-filling the remainder.
/// Pages are fixed-size and the directory/bucket arrays are sized so a
/// well-formed value always fits; a payload that doesn't is a programming
/// error, not a recoverable condition.
pub fn encode_into<T: Serialize>(value: &T, buf: &mut [u8]) {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .expect("page payload failed to encode");
    assert!(
        bytes.len() <= buf.len(),
        "encoded page payload ({} bytes) exceeds the page size ({} bytes)",
        bytes.len(),
        buf.len()
    );
    buf[..bytes.len()].copy_from_slice(&bytes);
    buf[bytes.len()..].fill(0);
}

pub fn decode_from<T: DeserializeOwned>(buf: &[u8]) -> T {
    bincode::serde::decode_from_slice(buf, bincode::config::standard())
        .expect("corrupt page payload")
        .0
}
