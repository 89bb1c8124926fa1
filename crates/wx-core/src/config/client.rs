//! Client configuration

use serde::{Deserialize, Serialize};

/// Settings for `wsexec connect`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Websocket URL to dial when none is given on the command line
    pub url: Option<String>,
}
