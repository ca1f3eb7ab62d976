// ABOUTME: Gateway error type and its HTTP mapping.
// ABOUTME: Clients see a fixed message per kind; adapter detail only reaches the logs.

use crate::runtime::{Classify, ErrorKind};
use crate::types::ContainerRef;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;

/// An operation failure as reported to HTTP clients.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    reference: Option<ContainerRef>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reference: None,
        }
    }

    /// Rejected input. `message` is ours and safe to return.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Map an adapter error, logging its detail.
    pub fn from_adapter<E: Classify>(err: &E, operation: &str) -> Self {
        let kind = err.kind();
        match kind {
            ErrorKind::Internal | ErrorKind::DaemonUnreachable | ErrorKind::Timeout => {
                tracing::warn!(operation, kind = %kind, error = %err, "Daemon call failed");
            }
            _ => {
                tracing::debug!(operation, kind = %kind, error = %err, "Daemon call rejected");
            }
        }
        Self::new(kind, default_message(kind))
    }

    pub fn with_ref(mut self, reference: ContainerRef) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn reference(&self) -> Option<&ContainerRef> {
        self.reference.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }
}

/// Fixed client-facing text for each kind.
pub fn default_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BadRequest => "request rejected by the container daemon",
        ErrorKind::NotFound => "container not found",
        ErrorKind::Conflict => "container state conflicts with the requested operation",
        ErrorKind::Timeout => "operation timed out; the container may still change state",
        ErrorKind::DaemonUnreachable => "container daemon is unreachable",
        ErrorKind::Internal => "internal error",
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::DaemonUnreachable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn timed_out(after: Duration) -> Self {
        tracing::warn!(?after, "Deadline elapsed before the daemon answered");
        Self::new(ErrorKind::Timeout, default_message(ErrorKind::Timeout))
    }
}

/// `{"kind": ..., "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    pub kind: ErrorKind,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    reference: Option<&'a ContainerRef>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: &self.message,
            },
            reference: self.reference.as_ref(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("invalid query string: {}", rejection.body_text()))
    }
}
