// ABOUTME: Runtime detection for the local system.
// ABOUTME: Uses the configured endpoint when given, else checks Podman sockets first, then Docker.

use super::types::{DaemonEndpoint, DetectedRuntime, EndpointError, RuntimeType};
use std::path::{Path, PathBuf};

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("invalid daemon endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Resolve the daemon to talk to.
///
/// An explicit `endpoint` (from config, `--daemon` or `DOCKER_HOST`) wins;
/// otherwise the local system is checked with [`detect_local`].
pub fn resolve_runtime(endpoint: Option<&str>) -> Result<DetectedRuntime, DetectionError> {
    match endpoint {
        Some(raw) => {
            let endpoint: DaemonEndpoint = raw.parse()?;
            Ok(DetectedRuntime::from_endpoint(endpoint))
        }
        None => detect_local(),
    }
}

/// Detect container runtime on the local system.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<DetectedRuntime, DetectionError> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(uid) = get_uid() {
        candidates.push((
            RuntimeType::Podman,
            PathBuf::from(format!("/run/user/{}/podman/podman.sock", uid)),
        ));
    }
    candidates.push((RuntimeType::Podman, PathBuf::from(ROOTFUL_PODMAN)));
    candidates.push((RuntimeType::Docker, PathBuf::from(DOCKER_SOCKET)));

    first_existing(candidates).ok_or(DetectionError::NoRuntimeFound)
}

fn first_existing(candidates: Vec<(RuntimeType, PathBuf)>) -> Option<DetectedRuntime> {
    candidates
        .into_iter()
        .find(|(_, path)| Path::new(path).exists())
        .map(|(runtime_type, path)| {
            tracing::debug!("Found {} socket at {}", runtime_type, path.display());
            DetectedRuntime {
                runtime_type,
                endpoint: DaemonEndpoint::Unix(path),
            }
        })
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
