//! Terminal size and its RESIZE payload encoding
//!
//! The payload is a small JSON object, `{"Width":80,"Height":24}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminalSize {
    /// Number of columns
    pub width: u16,
    /// Number of rows
    pub height: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

/// Encode a size as a RESIZE payload
pub fn encode_size(size: TerminalSize) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(&size)?)
}

/// Decode a RESIZE payload
pub fn decode_size(data: &[u8]) -> Result<TerminalSize, ProtocolError> {
    Ok(serde_json::from_slice(data)?)
}
