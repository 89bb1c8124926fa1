//! Frame kinds and their mapping onto transport message tags

use std::fmt;

use bytes::Bytes;

use crate::error::ProtocolError;

/// ASCII end-of-transmission, injected into the server's input stream so the
/// attached process is told to terminate
pub const END_OF_TRANSMISSION: u8 = 0x04;

/// ASCII escape, the lead byte of terminal escape sequences
pub const ESCAPE: u8 = 0x1b;

/// Upper bound on the follow-on bytes read after an escape
pub const ESCAPE_BURST_MAX: usize = 128;

/// Message tag as reported by the underlying message-framed transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// Textual framing
    Text,
    /// Binary framing
    Binary,
    /// Any other frame, identified by its raw opcode
    Other(u8),
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
            Self::Other(opcode) => write!(f, "opcode {:#x}", opcode),
        }
    }
}

/// The two logical channels multiplexed onto one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Raw terminal input/output bytes
    Data,
    /// Terminal size change notification
    Resize,
}

impl FrameKind {
    /// Transport tag used when writing this kind
    pub fn tag(&self) -> MessageTag {
        match self {
            Self::Data => MessageTag::Binary,
            Self::Resize => MessageTag::Text,
        }
    }

    /// Classify an inbound transport tag
    pub fn from_tag(tag: MessageTag) -> Result<Self, ProtocolError> {
        match tag {
            MessageTag::Binary => Ok(Self::Data),
            MessageTag::Text => Ok(Self::Resize),
            other => Err(ProtocolError::UnexpectedMessageType(other)),
        }
    }
}

/// Check whether a tag carries the DATA channel
pub fn is_data_tag(tag: MessageTag) -> bool {
    tag == FrameKind::Data.tag()
}

/// Check whether a tag carries the RESIZE channel
pub fn is_resize_tag(tag: MessageTag) -> bool {
    tag == FrameKind::Resize.tag()
}

/// One discrete unit written to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Logical channel
    pub kind: FrameKind,
    /// Message payload
    pub payload: Bytes,
}

impl Frame {
    /// Build a DATA frame
    pub fn data(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Data,
            payload: payload.into(),
        }
    }

    /// Build a RESIZE frame from an already encoded size
    pub fn resize(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Resize,
            payload: payload.into(),
        }
    }

    /// Transport tag for this frame
    pub fn tag(&self) -> MessageTag {
        self.kind.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_use_distinct_tags() {
        assert_eq!(Frame::data(&b"ls\r"[..]).tag(), MessageTag::Binary);
        assert_eq!(Frame::resize(&b"{}"[..]).tag(), MessageTag::Text);
    }

    #[test]
    fn test_classify_inbound_tags() {
        assert!(is_data_tag(MessageTag::Binary));
        assert!(!is_data_tag(MessageTag::Text));
        assert!(is_resize_tag(MessageTag::Text));
        assert!(!is_resize_tag(MessageTag::Other(0x9)));

        assert_eq!(FrameKind::from_tag(MessageTag::Binary).unwrap(), FrameKind::Data);
        assert_eq!(FrameKind::from_tag(MessageTag::Text).unwrap(), FrameKind::Resize);
    }

    #[test]
    fn test_unknown_tag_is_protocol_error() {
        let result = FrameKind::from_tag(MessageTag::Other(0x3));
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedMessageType(MessageTag::Other(0x3)))
        ));
    }
}
