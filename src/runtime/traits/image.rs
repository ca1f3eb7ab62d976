// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Pull, presence check, listing, and removal of local images.

use super::kind::{Classify, ErrorKind};
use super::shared_types::ImageSummary;
use crate::types::ImageRef;
use async_trait::async_trait;
use std::time::Duration;

/// Image operations.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    /// Check if an image exists locally.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;

    /// List local images.
    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError>;

    /// Remove a local image by name, tag, or ID.
    async fn remove_image(&self, reference: &ImageRef, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    /// A container still uses the image.
    #[error("image in use: {0}")]
    InUse(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Classify for ImageError {
    fn kind(&self) -> ErrorKind {
        match self {
            ImageError::NotFound(_) => ErrorKind::NotFound,
            ImageError::InUse(_) => ErrorKind::Conflict,
            ImageError::Unreachable(_) => ErrorKind::DaemonUnreachable,
            ImageError::Timeout(_) => ErrorKind::Timeout,
            ImageError::PullFailed(_) | ImageError::Runtime(_) => ErrorKind::Internal,
        }
    }

    fn timed_out(after: Duration) -> Self {
        ImageError::Timeout(after)
    }
}
