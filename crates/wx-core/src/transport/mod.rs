//! Transport bindings
//!
//! - [`ws`]: websocket connections via `tokio-tungstenite`
//! - [`memory`]: scripted in-memory halves for exercising sessions in tests

pub mod memory;
pub mod ws;
