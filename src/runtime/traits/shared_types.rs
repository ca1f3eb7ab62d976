// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: Container config and summaries, ports, image and network summaries, runtime metadata.

use crate::types::{ContainerRef, ImageRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container. Always chosen before the daemon call.
    pub name: ContainerRef,
    /// Image to run.
    pub image: ImageRef,
    /// Environment variables.
    pub env: HashMap<String, String>,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Port mappings (host:container).
    pub ports: Vec<PortMapping>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
}

impl ContainerConfig {
    pub fn new(name: ContainerRef, image: ImageRef) -> Self {
        Self {
            name,
            image,
            env: HashMap::new(),
            labels: HashMap::new(),
            ports: Vec::new(),
            command: None,
        }
    }
}

/// Port mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Host port to publish on, if any.
    pub host_port: Option<u16>,
    /// Container port.
    pub container_port: u16,
    /// Protocol (tcp/udp).
    pub protocol: Protocol,
}

impl PortMapping {
    /// Parse `"80"`, `"8080:80"` or `"8080:80/udp"`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (port_part, protocol) = match spec.split_once('/') {
            Some((ports, "tcp")) => (ports, Protocol::Tcp),
            Some((ports, "udp")) => (ports, Protocol::Udp),
            Some((_, other)) => return Err(format!("unsupported protocol: {other}")),
            None => (spec, Protocol::Tcp),
        };

        let parse_port = |s: &str| {
            s.parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| format!("invalid port: {s}"))
        };

        match port_part.split_once(':') {
            None => Ok(PortMapping {
                host_port: None,
                container_port: parse_port(port_part)?,
                protocol,
            }),
            Some((host, container)) => Ok(PortMapping {
                host_port: Some(parse_port(host)?),
                container_port: parse_port(container)?,
                protocol,
            }),
        }
    }

    /// Daemon port key, e.g. `80/tcp`.
    pub fn port_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

/// Network protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Projection of daemon state for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerRef,
    /// Container name.
    pub name: String,
    /// Image as the container was created with.
    pub image: String,
    /// Current state.
    pub status: ContainerStatus,
    /// Creation timestamp.
    pub created: Option<DateTime<Utc>>,
    /// Command line, if the daemon reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Exposed and published ports.
    pub ports: Vec<PublishedPort>,
}

/// One exposed container port and where it is published on the host, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPort {
    pub container_port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

impl PublishedPort {
    /// Expand a daemon port map (`"80/tcp" -> [bindings]`) into one entry per
    /// binding, sorted by container port. Unpublished ports appear once
    /// without a host side.
    pub fn from_port_map<I, B>(map: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (String, Option<B>)>,
        B: IntoIterator<Item = (Option<String>, Option<String>)>,
    {
        let mut ports = Vec::new();
        for (key, bindings) in map {
            let (port, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
            let Ok(container_port) = port.parse::<u16>() else {
                continue;
            };

            let mut published = false;
            for (host_ip, host_port) in bindings.into_iter().flatten() {
                published = true;
                ports.push(PublishedPort {
                    container_port,
                    protocol: protocol.to_string(),
                    host_ip: host_ip.filter(|ip| !ip.is_empty()),
                    host_port: host_port.and_then(|p| p.parse().ok()),
                });
            }
            if !published {
                ports.push(PublishedPort {
                    container_port,
                    protocol: protocol.to_string(),
                    host_ip: None,
                    host_port: None,
                });
            }
        }
        ports.sort_by(|a, b| {
            (a.container_port, &a.protocol, a.host_port)
                .cmp(&(b.container_port, &b.protocol, b.host_port))
        });
        ports
    }
}

/// A local image, one entry per image with its first repository tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Repository, `<none>` for untagged images.
    pub repository: String,
    /// Tag, `<none>` for untagged images.
    pub tag: String,
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    /// Size in bytes.
    pub size: i64,
}

impl ImageSummary {
    /// Split `repo:tag` at the last colon that is not part of a registry port.
    pub fn split_repo_tag(repo_tag: &str) -> (String, String) {
        match repo_tag.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => {
                (repository.to_string(), tag.to_string())
            }
            _ => (repo_tag.to_string(), String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub created: Option<DateTime<Utc>>,
    pub internal: bool,
    pub attachable: bool,
    pub ingress: bool,
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running | ContainerStatus::Restarting)
    }
}

impl FromStr for ContainerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" | "configured" | "initialized" => Ok(ContainerStatus::Created),
            "running" => Ok(ContainerStatus::Running),
            "paused" => Ok(ContainerStatus::Paused),
            "restarting" => Ok(ContainerStatus::Restarting),
            "removing" => Ok(ContainerStatus::Removing),
            // Podman reports transient "stopping"/"stopped" states
            "exited" | "stopped" | "stopping" => Ok(ContainerStatus::Exited),
            "dead" => Ok(ContainerStatus::Dead),
            other => Err(format!("unknown container state: {other}")),
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// Runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "docker", "podman").
    pub name: String,
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
