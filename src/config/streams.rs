// ABOUTME: Streaming session configuration.
// ABOUTME: Buffer size, overflow policy, and shutdown grace period.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What a session does when its client reads slower than the daemon writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Stop pulling from the daemon until the client catches up.
    #[default]
    Block,
    /// Discard the oldest buffered frame and report the loss.
    DropOldest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "block"),
            OverflowPolicy::DropOldest => write!(f, "drop-oldest"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamsConfig {
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

fn default_buffer_limit() -> usize {
    256
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

impl Default for StreamsConfig {
    fn default() -> Self {
        StreamsConfig {
            buffer_limit: default_buffer_limit(),
            overflow: OverflowPolicy::default(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}
