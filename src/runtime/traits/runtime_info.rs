// ABOUTME: Runtime info trait for container runtimes.
// ABOUTME: Query runtime version and metadata, and ping for reachability.

use super::kind::{Classify, ErrorKind};
use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;
use std::time::Duration;

/// Runtime metadata operations.
#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Get runtime version and metadata.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Ping the runtime to check connectivity.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

/// Errors from runtime info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for RuntimeInfoError {
    fn kind(&self) -> ErrorKind {
        match self {
            RuntimeInfoError::ConnectionFailed(_) => ErrorKind::DaemonUnreachable,
            RuntimeInfoError::Timeout(_) => ErrorKind::Timeout,
            RuntimeInfoError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        RuntimeInfoError::Timeout(after)
    }
}
