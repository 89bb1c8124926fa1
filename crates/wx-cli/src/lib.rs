//! wsexec: Command-line front end
//!
//! `wsexec serve` accepts websocket connections and runs a shell on a PTY
//! for each of them; `wsexec connect` attaches the local terminal to such a
//! server.

pub mod commands;
pub mod output;
pub mod pty;
