// ABOUTME: Daemon health check configuration.
// ABOUTME: Check budget and optional background interval.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Background check period. Unset disables the watcher.
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(3)
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            timeout: default_timeout(),
            interval: None,
        }
    }
}
