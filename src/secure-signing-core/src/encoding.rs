//! Base64 at the host boundary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::SigningError;

/// Standard base64 with padding.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 payload. A missing payload is `InvalidData`; an empty
/// string decodes to an empty message.
pub fn decode_data(data: Option<&str>) -> Result<Vec<u8>, SigningError> {
    let data = data.ok_or_else(|| SigningError::invalid_data("missing data param"))?;
    STANDARD
        .decode(data)
        .map_err(|e| SigningError::invalid_data(format!("data is not valid base64: {e}")))
}
