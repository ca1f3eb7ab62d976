// ABOUTME: Runtime type and daemon endpoint definitions.
// ABOUTME: Parses unix:// and tcp:// endpoints in DOCKER_HOST syntax.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Podman => write!(f, "podman"),
        }
    }
}

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEndpoint {
    /// Unix domain socket path.
    Unix(PathBuf),
    /// Plain HTTP over TCP, as `host:port`.
    Tcp(String),
}

impl DaemonEndpoint {
    /// Best guess at the runtime behind this endpoint, from the socket path.
    pub fn runtime_type(&self) -> RuntimeType {
        match self {
            DaemonEndpoint::Unix(path) if path.to_string_lossy().contains("podman") => {
                RuntimeType::Podman
            }
            _ => RuntimeType::Docker,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("daemon endpoint cannot be empty")]
    Empty,

    #[error("unsupported daemon endpoint scheme: {0} (expected unix:// or tcp://)")]
    UnsupportedScheme(String),

    #[error("daemon endpoint is missing an address: {0}")]
    MissingAddress(String),
}

impl FromStr for DaemonEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        if s.starts_with('/') {
            return Ok(DaemonEndpoint::Unix(PathBuf::from(s)));
        }

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| EndpointError::UnsupportedScheme(s.to_string()))?;

        let rest = rest.trim_end_matches('/');
        if rest.is_empty() {
            return Err(EndpointError::MissingAddress(s.to_string()));
        }

        match scheme {
            "unix" => {
                let path = format!("/{}", rest.trim_start_matches('/'));
                Ok(DaemonEndpoint::Unix(PathBuf::from(path)))
            }
            "tcp" | "http" => Ok(DaemonEndpoint::Tcp(rest.to_string())),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for DaemonEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            DaemonEndpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// A runtime found by detection or configuration.
#[derive(Debug, Clone)]
pub struct DetectedRuntime {
    /// The type of runtime detected.
    pub runtime_type: RuntimeType,
    /// Where to reach it.
    pub endpoint: DaemonEndpoint,
}

impl DetectedRuntime {
    pub fn from_endpoint(endpoint: DaemonEndpoint) -> Self {
        Self {
            runtime_type: endpoint.runtime_type(),
            endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_endpoints() {
        assert_eq!(
            "unix:///var/run/docker.sock".parse(),
            Ok(DaemonEndpoint::Unix(PathBuf::from("/var/run/docker.sock")))
        );
        assert_eq!(
            "/run/podman/podman.sock".parse(),
            Ok(DaemonEndpoint::Unix(PathBuf::from("/run/podman/podman.sock")))
        );
    }

    #[test]
    fn parses_tcp_endpoints() {
        assert_eq!(
            "tcp://10.0.0.5:2375".parse(),
            Ok(DaemonEndpoint::Tcp("10.0.0.5:2375".to_string()))
        );
        assert_eq!(
            "http://localhost:2375/".parse(),
            Ok(DaemonEndpoint::Tcp("localhost:2375".to_string()))
        );
    }

    #[test]
    fn rejects_unsupported_endpoints() {
        assert!(matches!(
            "ssh://user@host".parse::<DaemonEndpoint>(),
            Err(EndpointError::UnsupportedScheme(_))
        ));
        assert_eq!("".parse::<DaemonEndpoint>(), Err(EndpointError::Empty));
        assert!(matches!(
            "tcp://".parse::<DaemonEndpoint>(),
            Err(EndpointError::MissingAddress(_))
        ));
    }

    #[test]
    fn guesses_runtime_from_socket_path() {
        let podman: DaemonEndpoint = "unix:///run/user/1000/podman/podman.sock".parse().unwrap();
        assert_eq!(podman.runtime_type(), RuntimeType::Podman);
        let docker: DaemonEndpoint = "unix:///var/run/docker.sock".parse().unwrap();
        assert_eq!(docker.runtime_type(), RuntimeType::Docker);
    }

    #[test]
    fn display_round_trips_scheme() {
        let ep: DaemonEndpoint = "/var/run/docker.sock".parse().unwrap();
        assert_eq!(ep.to_string(), "unix:///var/run/docker.sock");
    }
}
