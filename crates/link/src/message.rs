//! Fixed-size message payloads
//!
//! Every packet carries exactly 48 bytes. Shorter messages are padded with
//! NUL bytes, and trailing NULs are stripped again on delivery.

use crate::{LinkError, Result};
use cosbit_core::protocol::DATA_BYTES;

/// Zero-pad a message to a full packet payload
pub fn pad_payload(bytes: &[u8]) -> Result<[u8; DATA_BYTES]> {
    if bytes.len() > DATA_BYTES {
        return Err(LinkError::MessageTooLong { len: bytes.len() });
    }
    let mut data = [0u8; DATA_BYTES];
    data[..bytes.len()].copy_from_slice(bytes);
    Ok(data)
}

/// UTF-8 encode and zero-pad a text message
pub fn pad_text(text: &str) -> Result<[u8; DATA_BYTES]> {
    pad_payload(text.as_bytes())
}

/// Payload bytes without the trailing NUL padding
pub fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

/// Render a payload as text, replacing invalid UTF-8
pub fn payload_text(data: &[u8]) -> String {
    String::from_utf8_lossy(trim_padding(data)).into_owned()
}
