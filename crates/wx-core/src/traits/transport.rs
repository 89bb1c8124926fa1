//! Message transport traits
//!
//! The transport delivers whole messages in order, each tagged text or
//! binary. Both halves are used from separate tasks, so reading never waits
//! on writing.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use wx_protocol::{Frame, MessageTag};

/// Transport-level control frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// Keepalive ping
    Ping(Bytes),
    /// Closing handshake carrying a status code and reason text
    Close { code: u16, reason: String },
}

/// Receiving half of a message-framed connection
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next whole message
    ///
    /// Ping and pong frames are handled by the transport and never returned.
    async fn recv(&mut self) -> Result<(MessageTag, Bytes), TransportError>;
}

/// Sending half of a message-framed connection
#[async_trait]
pub trait MessageSink: Send {
    /// Write one message with the given tag
    async fn send(&mut self, tag: MessageTag, payload: Bytes) -> Result<(), TransportError>;

    /// Write one control frame
    async fn send_control(&mut self, frame: ControlFrame) -> Result<(), TransportError>;

    /// Close the underlying connection
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Write a multiplexed frame under its channel's tag
    async fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tag = frame.tag();
        self.send(tag, frame.payload).await
    }
}
