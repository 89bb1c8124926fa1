//! Core error types for wsexec

use std::path::PathBuf;

use thiserror::Error;
use wx_protocol::{MessageTag, ProtocolError};

/// Close code of a normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when a close frame carried no status
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Errors raised by the message transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer sent a close frame
    #[error("connection closed by peer (code {code}): {reason}")]
    Closed { code: u16, reason: String },

    /// The connection was already closed
    #[error("connection already closed")]
    AlreadyClosed,

    /// A bounded control send did not complete in time
    #[error("timed out sending {0}")]
    Timeout(&'static str),

    /// The payload cannot be carried by the requested tag
    #[error("invalid payload for {tag} message")]
    InvalidPayload { tag: MessageTag },

    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other websocket failure
    #[error("websocket error: {0}")]
    Websocket(String),
}

impl TransportError {
    /// Whether this is a close notification from the peer
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Whether the peer closed with a normal closure
    pub fn is_normal_close(&self) -> bool {
        matches!(self, Self::Closed { code, .. } if *code == CLOSE_NORMAL)
    }

    /// Whether the connection was already gone
    pub fn is_already_closed(&self) -> bool {
        matches!(self, Self::AlreadyClosed)
    }
}

/// Terminal outcome of a client session or server adapter
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport failure, including remote close notifications
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local terminal I/O failure
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected frame or malformed payload
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The terminal size monitor ended
    #[error("terminal size monitor has been stopped")]
    SizeMonitorStopped,

    /// The exec stream driven by the embedder failed
    #[error("exec stream failed: {0}")]
    Exec(String),
}

impl SessionError {
    /// Whether this outcome is a close notification sent by the remote side
    pub fn is_remote_close(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_close())
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
