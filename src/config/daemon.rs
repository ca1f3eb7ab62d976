// ABOUTME: Daemon connection configuration.
// ABOUTME: Endpoint override and client-level connect timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    /// `unix:///path`, `/path`, `tcp://host:port`. Unset means local detection.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            endpoint: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}
