// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, remove, inspect, and list containers.

use super::kind::{Classify, ErrorKind};
use super::shared_types::{ContainerConfig, ContainerSummary};
use crate::types::ContainerRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create a container from the given configuration. Returns the daemon ID.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerRef, ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerRef) -> Result<(), ContainerError>;

    /// Stop a running container, killing it after `timeout`.
    async fn stop_container(
        &self,
        id: &ContainerRef,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerRef, force: bool)
    -> Result<(), ContainerError>;

    /// Get the current summary of a single container.
    async fn inspect_container(&self, id: &ContainerRef)
    -> Result<ContainerSummary, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("container removal already in progress: {0}")]
    RemovalInProgress(String),

    #[error("container state conflict: {0}")]
    Conflict(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for ContainerError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::NotFound(_) | ContainerError::ImageNotFound(_) => ErrorKind::NotFound,
            ContainerError::AlreadyExists(_)
            | ContainerError::NotRunning(_)
            | ContainerError::AlreadyRunning(_)
            | ContainerError::RemovalInProgress(_)
            | ContainerError::Conflict(_) => ErrorKind::Conflict,
            ContainerError::InvalidConfig(_) => ErrorKind::BadRequest,
            ContainerError::Unreachable(_) => ErrorKind::DaemonUnreachable,
            ContainerError::Timeout(_) => ErrorKind::Timeout,
            ContainerError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        ContainerError::Timeout(after)
    }
}
