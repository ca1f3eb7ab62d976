// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerStatus,
    ContainerSummary, EventError, EventFilter, EventOps, EventStream, ImageError, ImageOps,
    ImageSummary, LogChunk, LogChunkStream, LogError, LogOps, LogOptions, LogStream, NetworkError,
    NetworkOps, NetworkSummary, PortMapping, PublishedPort, RuntimeEvent, RuntimeInfo,
    RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{DaemonEndpoint, DetectedRuntime, RuntimeType};
use crate::types::{ContainerRef, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, EventsOptions, InspectContainerOptions,
    ListContainersOptions, ListImagesOptions, ListNetworksOptions, LogsOptions,
    RemoveContainerOptions, RemoveImageOptions, StartContainerOptions, StopContainerOptions,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

/// Coarse classification of a bollard error.
enum Fault<'a> {
    /// The daemon answered with an HTTP error status.
    Daemon { status: u16, message: &'a str },
    /// The daemon answered but the payload could not be decoded.
    Protocol,
    /// No usable answer: socket missing, connection refused or reset, client timeout.
    Transport,
}

fn fault(e: &bollard::errors::Error) -> Fault<'_> {
    use bollard::errors::Error;
    match e {
        Error::DockerResponseServerError {
            status_code,
            message,
        } => Fault::Daemon {
            status: *status_code,
            message,
        },
        Error::JsonDataError { .. }
        | Error::JsonSerdeError { .. }
        | Error::DockerStreamError { .. } => Fault::Protocol,
        _ => Fault::Transport,
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => ContainerError::ImageNotFound(message.to_string()),
        Fault::Daemon { status: 409, message } => ContainerError::AlreadyExists(message.to_string()),
        Fault::Daemon { status: 400, message } => ContainerError::InvalidConfig(message.to_string()),
        Fault::Transport => ContainerError::Unreachable(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => ContainerError::NotFound(message.to_string()),
        Fault::Daemon { status: 304, message } => {
            ContainerError::AlreadyRunning(message.to_string())
        }
        Fault::Daemon { status: 409, message } => ContainerError::Conflict(message.to_string()),
        Fault::Transport => ContainerError::Unreachable(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => ContainerError::NotFound(message.to_string()),
        Fault::Daemon { status: 304, message } => ContainerError::NotRunning(message.to_string()),
        Fault::Daemon { status: 409, message } => ContainerError::Conflict(message.to_string()),
        Fault::Transport => ContainerError::Unreachable(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_remove_error(e: bollard::errors::Error) -> ContainerError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => ContainerError::NotFound(message.to_string()),
        Fault::Daemon { status: 409, message } if message.contains("already in progress") => {
            ContainerError::RemovalInProgress(message.to_string())
        }
        Fault::Daemon { status: 409, message } => ContainerError::Conflict(message.to_string()),
        Fault::Transport => ContainerError::Unreachable(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => ContainerError::NotFound(message.to_string()),
        Fault::Transport => ContainerError::Unreachable(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_image_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match fault(&e) {
        Fault::Daemon { status: 404, .. } => ImageError::NotFound(image_name.to_string()),
        Fault::Transport => ImageError::Unreachable(e.to_string()),
        _ => ImageError::PullFailed(format!("{}: {}", image_name, e)),
    }
}

fn map_image_remove_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match fault(&e) {
        Fault::Daemon { status: 404, .. } => ImageError::NotFound(image_name.to_string()),
        Fault::Daemon { status: 409, message } => ImageError::InUse(message.to_string()),
        Fault::Transport => ImageError::Unreachable(e.to_string()),
        _ => ImageError::Runtime(e.to_string()),
    }
}

fn map_image_list_error(e: bollard::errors::Error) -> ImageError {
    match fault(&e) {
        Fault::Transport => ImageError::Unreachable(e.to_string()),
        _ => ImageError::Runtime(e.to_string()),
    }
}

fn map_network_error(e: bollard::errors::Error) -> NetworkError {
    match fault(&e) {
        Fault::Transport => NetworkError::Unreachable(e.to_string()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_log_error(e: bollard::errors::Error) -> LogError {
    match fault(&e) {
        Fault::Daemon { status: 404, message } => LogError::ContainerNotFound(message.to_string()),
        Fault::Transport => LogError::Unreachable(e.to_string()),
        _ => LogError::StreamError(e.to_string()),
    }
}

fn map_event_error(e: bollard::errors::Error) -> EventError {
    match fault(&e) {
        Fault::Daemon { status: 400, message } => EventError::InvalidFilter(message.to_string()),
        Fault::Transport => EventError::Unreachable(e.to_string()),
        _ => EventError::StreamError(e.to_string()),
    }
}

fn map_info_error(e: bollard::errors::Error) -> RuntimeInfoError {
    match fault(&e) {
        Fault::Transport => RuntimeInfoError::ConnectionFailed(e.to_string()),
        _ => RuntimeInfoError::Runtime(e.to_string()),
    }
}

/// Daemon enum values arrive as SCREAMING_CASE variants; their Debug form
/// lowercased is the wire spelling.
fn parse_status<S: std::fmt::Debug>(state: Option<S>) -> ContainerStatus {
    state
        .map(|s| format!("{:?}", s).to_lowercase())
        .and_then(|s| s.parse().ok())
        .unwrap_or(ContainerStatus::Exited)
}

fn port_bindings(ports: &[PortMapping]) -> HashMap<String, Option<Vec<PortBinding>>> {
    ports
        .iter()
        .filter_map(|port| {
            port.host_port.map(|host_port| {
                (
                    port.port_key(),
                    Some(vec![PortBinding {
                        host_ip: None,
                        host_port: Some(host_port.to_string()),
                    }]),
                )
            })
        })
        .collect()
}

/// List endpoints report one entry per binding already; keep that shape.
fn published_ports(ports: Vec<bollard::models::PortSummary>) -> Vec<PublishedPort> {
    let mut published: Vec<PublishedPort> = ports
        .into_iter()
        .map(|port| PublishedPort {
            container_port: port.private_port,
            protocol: port
                .typ
                .map(|t| t.to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "tcp".to_string()),
            host_ip: port.ip.filter(|ip| !ip.is_empty()),
            host_port: port.public_port,
        })
        .collect();
    published.sort_by(|a, b| {
        (a.container_port, &a.protocol, a.host_port)
            .cmp(&(b.container_port, &b.protocol, b.host_port))
    });
    published
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API. This is the only
/// type in the crate that holds a daemon connection.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Connect to a container runtime using detected runtime info.
    ///
    /// Use with `resolve_runtime()` or `detect_local()`. `timeout` bounds each
    /// HTTP exchange with the daemon at the client level.
    pub fn connect(info: &DetectedRuntime, timeout: Duration) -> Result<Self, RuntimeInfoError> {
        let timeout_secs = timeout.as_secs().max(1);
        let client = match &info.endpoint {
            DaemonEndpoint::Unix(path) => Docker::connect_with_unix(
                &path.to_string_lossy(),
                timeout_secs,
                bollard::API_DEFAULT_VERSION,
            ),
            DaemonEndpoint::Tcp(addr) => Docker::connect_with_http(
                &format!("tcp://{}", addr),
                timeout_secs,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            runtime_type: info.runtime_type,
        })
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let version = self.client.version().await.map_err(map_info_error)?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client.ping().await.map_err(map_info_error)?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.pull_reference();

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            let progress = result.map_err(|e| map_image_error(e, &image_name))?;
            if let Some(detail) = progress.error_detail.and_then(|d| d.message) {
                return Err(ImageError::PullFailed(format!("{}: {}", image_name, detail)));
            }
        }

        tracing::debug!("Pulled image {}", image_name);
        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image_name = reference.pull_reference();

        match self.client.inspect_image(&image_name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(map_image_error(e, &image_name)),
        }
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError> {
        let images = self
            .client
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(map_image_list_error)?;

        Ok(images
            .into_iter()
            .map(|image| {
                let (repository, tag) = image
                    .repo_tags
                    .first()
                    .map(|repo_tag| ImageSummary::split_repo_tag(repo_tag))
                    .unwrap_or_else(|| ("<none>".to_string(), "<none>".to_string()));
                ImageSummary {
                    repository,
                    tag,
                    id: image.id,
                    created: DateTime::<Utc>::from_timestamp(image.created, 0),
                    size: image.size,
                }
            })
            .collect())
    }

    async fn remove_image(&self, reference: &ImageRef, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        let deleted = self
            .client
            .remove_image(reference.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, reference.as_str()))?;

        tracing::debug!("Removed image {} ({} layer(s))", reference, deleted.len());
        Ok(())
    }
}

#[async_trait]
impl NetworkOps for BollardRuntime {
    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError> {
        let networks = self
            .client
            .list_networks(None::<ListNetworksOptions>)
            .await
            .map_err(map_network_error)?;

        Ok(networks
            .into_iter()
            .map(|network| NetworkSummary {
                id: network.id.unwrap_or_default(),
                name: network.name.unwrap_or_default(),
                driver: network.driver.unwrap_or_default(),
                scope: network.scope.unwrap_or_default(),
                created: network.created,
                internal: network.internal.unwrap_or(false),
                attachable: network.attachable.unwrap_or(false),
                ingress: network.ingress.unwrap_or(false),
            })
            .collect())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerRef, ContainerError> {
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let bindings = port_bindings(&config.ports);
        let exposed_ports: Vec<String> = config.ports.iter().map(PortMapping::port_key).collect();

        let host_config = HostConfig {
            port_bindings: if bindings.is_empty() {
                None
            } else {
                Some(bindings)
            },
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(config.image.to_string()),
            env: if env.is_empty() { None } else { Some(env) },
            labels: if config.labels.is_empty() {
                None
            } else {
                Some(config.labels.clone())
            },
            cmd: config.command.clone(),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(config.name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!("Daemon warning creating {}: {}", config.name, warning);
        }

        ContainerRef::parse(&response.id)
            .map_err(|e| ContainerError::Runtime(format!("daemon returned invalid id: {}", e)))
    }

    async fn start_container(&self, id: &ContainerRef) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerRef,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs().min(i32::MAX as u64) as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(
        &self,
        id: &ContainerRef,
        force: bool,
    ) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_remove_error)
    }

    async fn inspect_container(
        &self,
        id: &ContainerRef,
    ) -> Result<ContainerSummary, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let status = parse_status(details.state.and_then(|s| s.status));
        let container_id = details
            .id
            .as_deref()
            .and_then(|raw| ContainerRef::parse(raw).ok())
            .unwrap_or_else(|| id.clone());
        let config = details.config.unwrap_or_default();
        let ports = details
            .network_settings
            .and_then(|settings| settings.ports)
            .map(|map| {
                PublishedPort::from_port_map(map.into_iter().map(|(key, bindings)| {
                    let bindings = bindings.map(|list| {
                        list.into_iter()
                            .map(|b| (b.host_ip, b.host_port))
                            .collect::<Vec<_>>()
                    });
                    (key, bindings)
                }))
            })
            .unwrap_or_default();

        Ok(ContainerSummary {
            id: container_id,
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.image.unwrap_or_default(),
            status,
            created: details.created,
            command: config.cmd.map(|cmd| cmd.join(" ")),
            labels: config.labels.unwrap_or_default(),
            ports,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                });
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        // Podman's transient "stopping" state fails decoding and maps to Runtime
        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let id = ContainerRef::parse(c.id.as_deref()?).ok()?;
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();

                Some(ContainerSummary {
                    id,
                    name,
                    image: c.image.unwrap_or_default(),
                    status: parse_status(c.state),
                    created: c
                        .created
                        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
                    command: c.command,
                    labels: c.labels.unwrap_or_default(),
                    ports: published_ports(c.ports.unwrap_or_default()),
                })
            })
            .collect())
    }
}

#[async_trait]
impl LogOps for BollardRuntime {
    async fn container_logs(
        &self,
        id: &ContainerRef,
        opts: &LogOptions,
    ) -> Result<LogChunkStream, LogError> {
        let log_opts = LogsOptions {
            stdout: opts.stdout,
            stderr: opts.stderr,
            follow: opts.follow,
            timestamps: opts.timestamps,
            tail: opts
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let stream = self.client.logs(id.as_str(), Some(log_opts));

        let mapped_stream = stream.map(|result| {
            result
                .map(|output| {
                    let (stream_type, data) = match output {
                        bollard::container::LogOutput::StdErr { message } => {
                            (LogStream::Stderr, message)
                        }
                        bollard::container::LogOutput::StdOut { message }
                        | bollard::container::LogOutput::StdIn { message }
                        | bollard::container::LogOutput::Console { message } => {
                            (LogStream::Stdout, message)
                        }
                    };

                    LogChunk {
                        stream: stream_type,
                        line: String::from_utf8_lossy(&data)
                            .trim_end_matches('\n')
                            .to_string(),
                    }
                })
                .map_err(map_log_error)
        });

        Ok(Box::pin(mapped_stream))
    }
}

#[async_trait]
impl EventOps for BollardRuntime {
    async fn events(&self, filter: &EventFilter) -> Result<EventStream, EventError> {
        let opts = EventsOptions {
            filters: Some(filter.to_filter_map()),
            ..Default::default()
        };

        let stream = self.client.events(Some(opts)).map(|result| {
            result
                .map(|message| {
                    let actor = message.actor.unwrap_or_default();
                    RuntimeEvent {
                        kind: message
                            .typ
                            .map(|t| format!("{:?}", t).to_lowercase())
                            .unwrap_or_default(),
                        action: message.action.unwrap_or_default(),
                        actor: actor.id.unwrap_or_default(),
                        attributes: actor.attributes.unwrap_or_default(),
                        time: message
                            .time
                            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
                    }
                })
                .map_err(map_event_error)
        });

        Ok(Box::pin(stream))
    }
}
