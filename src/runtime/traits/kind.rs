// ABOUTME: Error classification shared by every runtime capability trait.
// ABOUTME: Lets the gateway map adapter failures without inspecting daemon messages.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Client input rejected before reaching the daemon.
    BadRequest,
    /// The daemon does not know the referenced object.
    NotFound,
    /// The object exists but is in a state that forbids the operation.
    Conflict,
    /// The call's deadline elapsed before the daemon answered.
    Timeout,
    /// Connection or transport failure talking to the daemon.
    DaemonUnreachable,
    /// Anything unclassified.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DaemonUnreachable => "daemon_unreachable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every adapter error type.
pub trait Classify: std::error::Error + Send + Sync + 'static {
    /// Classify this error into the gateway taxonomy.
    fn kind(&self) -> ErrorKind;

    /// Build the error reported when a call exceeds its deadline.
    fn timed_out(after: Duration) -> Self
    where
        Self: Sized;
}
