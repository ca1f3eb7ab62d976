// ABOUTME: Network operations trait for container runtimes.
// ABOUTME: Read-only listing of daemon networks.

use super::kind::{Classify, ErrorKind};
use super::shared_types::NetworkSummary;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait NetworkOps: Send + Sync {
    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for NetworkError {
    fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::Unreachable(_) => ErrorKind::DaemonUnreachable,
            NetworkError::Timeout(_) => ErrorKind::Timeout,
            NetworkError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        NetworkError::Timeout(after)
    }
}
