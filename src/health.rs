// ABOUTME: Daemon health monitor.
// ABOUTME: Bounded daemon ping, optionally repeated in the background to log transitions.

use crate::config::Config;
use crate::gateway::{READ_RETRY_BACKOFF, default_message, read_with_retry};
use crate::runtime::{Classify, Deadline, ErrorKind, Runtime};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of one health check. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded { kind: ErrorKind, error: String },
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

#[derive(Clone)]
pub struct HealthMonitor {
    runtime: Arc<dyn Runtime>,
    timeout: Duration,
    retry_backoff: Duration,
}

impl HealthMonitor {
    pub fn new(runtime: Arc<dyn Runtime>, timeout: Duration) -> Self {
        Self {
            runtime,
            timeout,
            retry_backoff: READ_RETRY_BACKOFF,
        }
    }

    pub fn from_config(runtime: Arc<dyn Runtime>, config: &Config) -> Self {
        Self::new(runtime, config.health.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ping the daemon within the check budget. Returns `Degraded` on any
    /// failure, including a hung daemon.
    pub async fn check(&self) -> HealthStatus {
        let deadline = Deadline::after(self.timeout);
        let result = read_with_retry(&deadline, self.retry_backoff, "ping", || {
            self.runtime.ping()
        })
        .await;

        match result {
            Ok(()) => HealthStatus::Ok,
            Err(e) => {
                let kind = e.kind();
                tracing::debug!(kind = %kind, error = %e, "Health check failed");
                HealthStatus::Degraded {
                    kind,
                    error: default_message(kind).to_string(),
                }
            }
        }
    }

    /// Check every `interval` until `shutdown` fires, logging transitions.
    pub fn watch(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut healthy: Option<bool> = None;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let status = monitor.check().await;
                match (healthy, &status) {
                    (Some(false), HealthStatus::Ok) => tracing::info!("Daemon recovered"),
                    (None | Some(true), HealthStatus::Degraded { error, .. }) => {
                        tracing::warn!("Daemon degraded: {}", error)
                    }
                    _ => {}
                }
                healthy = Some(status.is_ok());
            }
        })
    }
}
