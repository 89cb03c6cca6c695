//! Transport encoding for cover images
//!
//! Covers travel to and from the client as standard base64 text.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode raw image bytes for a JSON payload
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a cover sent back by the client
///
/// Accepts either bare base64 or a `data:image/...;base64,` URL.
pub fn decode_image(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let text = text.trim();
    let payload = match text.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => text,
    };
    STANDARD.decode(payload)
}
