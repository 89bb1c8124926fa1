//! Collaborator traits

mod terminal;
mod transport;

pub use terminal::{SizeMonitor, Terminal, TerminalSizeQueue};
pub use transport::{ControlFrame, MessageSink, MessageSource};
