//! Maybe-already-encoded base64 content fields.
//!
//! Persisted html/css/js sub-fields are base64-encoded, but legacy
//! documents and partial writes may hold plain text. Encoding is made
//! idempotent by always decoding first: a failed decode means the input
//! was plain text, never an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Decode `value` if it is valid base64 for a UTF-8 payload; otherwise
/// return it unchanged (it was already plain text).
pub fn decode_if_base64(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    match STANDARD.decode(value) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => value.to_string(),
        },
        Err(_) => value.to_string(),
    }
}

/// Base64-encode `value` without double-encoding already-encoded input.
pub fn encode_base64_idempotent(value: &str) -> String {
    STANDARD.encode(decode_if_base64(value))
}
