//! Base64 codec for binary data carried in JSON bodies: relay monitoring
//! payloads and packed configuration archives.

use base64::{Engine as _, engine::general_purpose::STANDARD};

pub use base64::DecodeError;

/// Standard, padded base64.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn base64_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(input)
}
