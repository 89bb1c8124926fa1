//! wx-client: Terminal-facing side of a wsexec connection
//!
//! A [`ClientSession`] binds a local interactive terminal to one
//! multiplexed connection: keystrokes go out as DATA frames, local resizes
//! go out as RESIZE frames, and everything received is written to the
//! terminal.

pub mod input;
pub mod session;
pub mod terminal;

pub use session::ClientSession;
pub use terminal::StdTerminal;
