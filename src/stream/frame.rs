// ABOUTME: Wire frames for streaming sessions.
// ABOUTME: One JSON object per line: log, event, lagged, closed.

use crate::gateway::default_message;
use crate::runtime::{ErrorKind, LogChunk, RuntimeEvent};
use bytes::Bytes;
use serde::Serialize;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// Why a stream ended, as reported in the terminal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseReason {
    DaemonEof,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Log(LogChunk),
    Event {
        event: RuntimeEvent,
    },
    /// Frames discarded by the drop-oldest policy since the last delivery.
    Lagged {
        dropped: u64,
    },
    Closed {
        reason: CloseReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<FrameError>,
    },
}

impl Frame {
    pub fn daemon_eof() -> Self {
        Frame::Closed {
            reason: CloseReason::DaemonEof,
            error: None,
        }
    }

    /// Terminal error frame with the fixed client-facing text for `kind`.
    pub fn error(kind: ErrorKind) -> Self {
        Self::error_with_message(kind, default_message(kind))
    }

    pub fn error_with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Frame::Closed {
            reason: CloseReason::Error,
            error: Some(FrameError {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Closed { .. })
    }

    /// Serialize as one NDJSON line.
    pub fn to_line(&self) -> Result<Bytes, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(Bytes::from(buf))
    }
}

impl From<LogChunk> for Frame {
    fn from(chunk: LogChunk) -> Self {
        Frame::Log(chunk)
    }
}

impl From<RuntimeEvent> for Frame {
    fn from(event: RuntimeEvent) -> Self {
        Frame::Event { event }
    }
}
