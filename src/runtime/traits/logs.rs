// ABOUTME: Log operations trait for container runtimes.
// ABOUTME: Lazy, cancellable container log streams with filtering options.

use super::kind::{Classify, ErrorKind};
use crate::types::ContainerRef;
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;

/// A lazy sequence of log chunks. Dropping it releases the daemon request.
pub type LogChunkStream = Pin<Box<dyn Stream<Item = Result<LogChunk, LogError>> + Send>>;

/// Log streaming operations.
#[async_trait]
pub trait LogOps: Send + Sync {
    /// Stream logs from a container.
    async fn container_logs(
        &self,
        id: &ContainerRef,
        opts: &LogOptions,
    ) -> Result<LogChunkStream, LogError>;
}

/// Options for log streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Include stdout.
    pub stdout: bool,
    /// Include stderr.
    pub stderr: bool,
    /// Follow log output (like `tail -f`).
    pub follow: bool,
    /// Prefix lines with daemon timestamps.
    pub timestamps: bool,
    /// Number of lines to show from end (None = all).
    pub tail: Option<u64>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            tail: None,
        }
    }
}

/// A single chunk of container output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogChunk {
    /// Whether this is from stdout or stderr.
    pub stream: LogStream,
    /// The log content.
    pub line: String,
}

impl LogChunk {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stdout,
            line: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stderr,
            line: line.into(),
        }
    }
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Errors from log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for LogError {
    fn kind(&self) -> ErrorKind {
        match self {
            LogError::ContainerNotFound(_) => ErrorKind::NotFound,
            LogError::Unreachable(_) => ErrorKind::DaemonUnreachable,
            LogError::Timeout(_) => ErrorKind::Timeout,
            LogError::StreamError(_) | LogError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        LogError::Timeout(after)
    }
}
