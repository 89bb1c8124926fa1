//! Protocol error types

use thiserror::Error;

use crate::message::MessageTag;

/// Errors that can occur while interpreting inbound messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A message arrived with a tag that maps to neither channel
    #[error("received unexpected message type: {0}")]
    UnexpectedMessageType(MessageTag),

    /// A resize payload could not be decoded
    #[error("malformed terminal size payload: {0}")]
    MalformedSize(#[from] serde_json::Error),
}
