// ABOUTME: Event subscription trait for container runtimes.
// ABOUTME: Lazy, cancellable daemon event streams with type/actor/action filters.

use super::kind::{Classify, ErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

/// A lazy sequence of daemon events. Dropping it ends the subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RuntimeEvent, EventError>> + Send>>;

/// Daemon event subscription.
#[async_trait]
pub trait EventOps: Send + Sync {
    /// Subscribe to daemon events matching `filter`.
    async fn events(&self, filter: &EventFilter) -> Result<EventStream, EventError>;
}

/// Filters for an event subscription. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Object types (`container`, `image`, `network`, `volume`, ...).
    pub types: Vec<String>,
    /// Container IDs or names.
    pub containers: Vec<String>,
    /// Actions (`start`, `die`, `destroy`, ...).
    pub actions: Vec<String>,
}

impl EventFilter {
    /// Render as daemon filter map.
    pub fn to_filter_map(&self) -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        if !self.types.is_empty() {
            map.insert("type".to_string(), self.types.clone());
        }
        if !self.containers.is_empty() {
            map.insert("container".to_string(), self.containers.clone());
        }
        if !self.actions.is_empty() {
            map.insert("event".to_string(), self.actions.clone());
        }
        map
    }
}

/// A single daemon event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEvent {
    /// Object type the event concerns.
    #[serde(rename = "type")]
    pub kind: String,
    /// What happened.
    pub action: String,
    /// ID of the object the event concerns.
    pub actor: String,
    /// Extra attributes (container name, image, exit code, ...).
    pub attributes: HashMap<String, String>,
    /// When the daemon emitted it.
    pub time: Option<DateTime<Utc>>,
}

/// Errors from event subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid event filter: {0}")]
    InvalidFilter(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for EventError {
    fn kind(&self) -> ErrorKind {
        match self {
            EventError::InvalidFilter(_) => ErrorKind::BadRequest,
            EventError::Unreachable(_) => ErrorKind::DaemonUnreachable,
            EventError::Timeout(_) => ErrorKind::Timeout,
            EventError::StreamError(_) | EventError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        EventError::Timeout(after)
    }
}
