//! wx-core: Core abstractions and configuration for wsexec
//!
//! This crate provides the error taxonomy, the transport and terminal
//! collaborator traits, the websocket transport binding and the
//! configuration structures shared by the client, server and CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod transport;

pub use error::{ConfigError, SessionError, TransportError};
pub use traits::{ControlFrame, MessageSink, MessageSource, SizeMonitor, Terminal, TerminalSizeQueue};
