// ABOUTME: Startup errors raised while resolving and connecting to the daemon.
// ABOUTME: Each failure carries an operator hint that the CLI prints under the error.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::RuntimeInfoError;
use super::types::DaemonEndpoint;

/// Failure wiring the adapter to a daemon before the server starts.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("cannot resolve daemon endpoint: {source}"))]
    Resolve { source: DetectionError },

    #[snafu(display("cannot open a client for {endpoint}: {source}"))]
    Connect {
        endpoint: DaemonEndpoint,
        source: RuntimeInfoError,
    },
}

impl RuntimeError {
    /// What the operator can change to get past this failure.
    pub fn hint(&self) -> &'static str {
        match self {
            RuntimeError::Resolve {
                source: DetectionError::NoRuntimeFound,
            } => "start Docker or Podman, or point --daemon / DOCKER_HOST at a daemon",
            RuntimeError::Resolve {
                source: DetectionError::InvalidEndpoint(_),
            } => "endpoints look like unix:///var/run/docker.sock or tcp://host:2375",
            RuntimeError::Connect {
                endpoint: DaemonEndpoint::Unix(_),
                ..
            } => "check that the socket exists and is readable by this user",
            RuntimeError::Connect { .. } => "check that the daemon listens on that address",
        }
    }
}
