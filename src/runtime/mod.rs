// ABOUTME: Container runtime adapter for Docker and Podman.
// ABOUTME: Resolves the daemon endpoint and exposes capability traits over bollard.

mod bollard;
mod deadline;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use deadline::Deadline;
pub use detection::{DetectionError, detect_local, resolve_runtime};
pub use error::{ConnectSnafu, ResolveSnafu, RuntimeError};
pub use traits::*;
pub use types::{DaemonEndpoint, DetectedRuntime, EndpointError, RuntimeType};
