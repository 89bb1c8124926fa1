//! Stream adapter configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Timing options of the server stream adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interval between keepalive pings
    #[serde(with = "duration_secs")]
    pub ping_interval: Duration,

    /// Bound on sending one ping
    #[serde(with = "duration_secs")]
    pub ping_timeout: Duration,

    /// Bound on sending the close frame
    #[serde(with = "duration_secs")]
    pub close_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(5),
        }
    }
}
