//! wx-protocol: Wire vocabulary for wsexec
//!
//! One message-framed connection carries two logical channels. The channel
//! of a message is carried by the transport's own message tag:
//!
//! | Transport tag | Channel | Payload                    |
//! |---------------|---------|----------------------------|
//! | text          | RESIZE  | JSON encoded terminal size |
//! | binary        | DATA    | raw terminal bytes         |
//!
//! Any other tag is a protocol error.

pub mod error;
pub mod message;
pub mod size;

pub use error::ProtocolError;
pub use message::{
    is_data_tag, is_resize_tag, Frame, FrameKind, MessageTag, END_OF_TRANSMISSION, ESCAPE,
    ESCAPE_BURST_MAX,
};
pub use size::{decode_size, encode_size, TerminalSize};
