//! Compiled bytecode payloads.
//!
//! Method bodies and type initializers are stored as length-prefixed base64 text. The
//! loader decodes them once; the payload itself is opaque to this crate and is handed to
//! the host's [`crate::runtime::Executor`] unchanged.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::Result;

/// A decoded bytecode payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteCode {
    data: Vec<u8>,
}

impl ByteCode {
    /// Wrap raw bytecode
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        ByteCode { data }
    }

    /// Decode the wire text form. An empty string is an empty payload.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `text` is not valid base64.
    pub fn decode(text: &[u8]) -> Result<Self> {
        if text.is_empty() {
            return Ok(ByteCode::default());
        }

        let data = STANDARD
            .decode(text)
            .map_err(|e| malformed_error!("Invalid bytecode encoding - {}", e))?;
        Ok(ByteCode { data })
    }

    /// Encode to the wire text form
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// The raw payload
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the payload in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for an empty payload (abstract, native or trivial initializer)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text() {
        let code = ByteCode::decode(b"G0x1YVE=").unwrap();
        assert_eq!(code.data(), b"\x1bLuaQ");
        assert_eq!(code.encode(), "G0x1YVE=");
    }

    #[test]
    fn empty_payload() {
        let code = ByteCode::decode(b"").unwrap();
        assert!(code.is_empty());
        assert_eq!(code.encode(), "");
    }

    #[test]
    fn invalid_text() {
        assert!(matches!(
            ByteCode::decode(b"not base64!"),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
