//! Configuration of the `serve` command

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::server::ServerConfig;

/// Settings for accepting websocket exec connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Address to listen on
    pub bind: String,

    /// Shell to exec for each connection (None = `$SHELL`, then `/bin/sh`)
    pub shell: Option<String>,

    /// Extra environment for the shell
    pub env: Vec<(String, String)>,

    /// Record inbound DATA frames to this file
    pub debug_input: Option<PathBuf>,

    /// Record outbound process output to this file
    pub debug_output: Option<PathBuf>,

    /// Stream adapter timing
    pub adapter: ServerConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            shell: None,
            env: vec![("TERM".to_string(), "xterm-256color".to_string())],
            debug_input: None,
            debug_output: None,
            adapter: ServerConfig::default(),
        }
    }
}
