// ABOUTME: Streaming session identity, kind, and lifecycle state.
// ABOUTME: The HTTP body half owns a drop guard that cancels the session.

use super::channel::FrameStream;
use super::frame::Frame;
use crate::types::ContainerRef;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::DropGuard;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionKind {
    Logs { container: ContainerRef },
    Events { container: Option<ContainerRef> },
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Logs { container } => write!(f, "logs:{}", container),
            SessionKind::Events {
                container: Some(container),
            } => write!(f, "events:{}", container),
            SessionKind::Events { container: None } => write!(f, "events"),
        }
    }
}

/// Who ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseCause {
    Client,
    DaemonEof,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Opening,
    Streaming,
    Closed(CloseCause),
}

/// Snapshot of one live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
}

/// Consumer half of a session, handed to the HTTP response.
///
/// Dropping it cancels the session, which releases the daemon stream.
pub struct SessionBody {
    id: Uuid,
    frames: FrameStream,
    _cancel_on_drop: DropGuard,
}

impl SessionBody {
    pub(super) fn new(id: Uuid, frames: FrameStream, guard: DropGuard) -> Self {
        Self {
            id,
            frames,
            _cancel_on_drop: guard,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next frame; `None` after the terminal frame has been delivered.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.next().await
    }

    /// NDJSON byte stream for an HTTP body.
    pub fn into_byte_stream(self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        futures::stream::unfold(self, |mut body| async move {
            let frame = body.next_frame().await?;
            let line = frame.to_line().map_err(std::io::Error::other);
            Some((line, body))
        })
    }
}
