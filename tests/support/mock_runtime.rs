// ABOUTME: In-memory container runtime for gateway, streaming, and HTTP tests.
// ABOUTME: Mirrors daemon semantics (304/404/409) and counts open subscriptions.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use nocli::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerStatus,
    ContainerSummary, EventError, EventFilter, EventOps, EventStream, ImageError, ImageOps,
    ImageSummary, LogChunk, LogChunkStream, LogError, LogOps, LogOptions, NetworkError, NetworkOps,
    NetworkSummary, PublishedPort, RuntimeEvent, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use nocli::types::{ContainerRef, ImageRef};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// What a log stream does after its scripted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTail {
    /// Stream ends (container exited).
    End,
    /// Stream stays open until dropped.
    Open,
    /// Stream fails with a transport error.
    Fail,
}

struct Container {
    summary: ContainerSummary,
    logs: Vec<LogChunk>,
    tail: LogTail,
    removing: bool,
}

/// Decrements the subscription counter when the stream holding it is dropped.
struct SubscriptionGuard(Arc<AtomicUsize>);

impl SubscriptionGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockRuntime {
    containers: Mutex<Vec<Container>>,
    images: Mutex<BTreeSet<String>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    unreachable: AtomicBool,
    fail_next: AtomicUsize,
    stopping: AtomicBool,
    hang: AtomicBool,
    subscriptions: Arc<AtomicUsize>,
    next_id: AtomicUsize,
    events: broadcast::Sender<RuntimeEvent>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            containers: Mutex::new(Vec::new()),
            images: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(HashMap::new()),
            unreachable: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
            stopping: AtomicBool::new(false),
            hang: AtomicBool::new(false),
            subscriptions: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicUsize::new(1),
            events,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make an image available locally.
    pub fn with_image(self, image: &str) -> Self {
        self.images.lock().insert(image.to_string());
        self
    }

    /// Insert a container directly, bypassing create. Returns its id.
    pub fn add_container(&self, name: &str, image: &str, status: ContainerStatus) -> ContainerRef {
        let id = self.allocate_id();
        self.containers.lock().push(Container {
            summary: ContainerSummary {
                id: id.clone(),
                name: name.to_string(),
                image: image.to_string(),
                status,
                created: Some(Utc::now()),
                command: None,
                labels: HashMap::new(),
                ports: Vec::new(),
            },
            logs: Vec::new(),
            tail: LogTail::End,
            removing: false,
        });
        id
    }

    /// Script the log stream of container `reference`.
    pub fn set_logs(&self, reference: &str, lines: Vec<LogChunk>, tail: LogTail) {
        let mut containers = self.containers.lock();
        let container = containers
            .iter_mut()
            .find(|c| matches(c, reference))
            .expect("container exists");
        container.logs = lines;
        container.tail = tail;
    }

    /// Make the next remove of `reference` report removal already in progress.
    pub fn mark_removing(&self, reference: &str) {
        let mut containers = self.containers.lock();
        if let Some(c) = containers.iter_mut().find(|c| matches(c, reference)) {
            c.removing = true;
            c.summary.status = ContainerStatus::Removing;
        }
    }

    /// Every call fails as if the socket were gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// The next `n` calls fail as unreachable, then calls succeed again.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Listing fails to decode, as Podman's "stopping" state does.
    pub fn set_stopping(&self, stopping: bool) {
        self.stopping.store(stopping, Ordering::SeqCst);
    }

    /// Every call hangs forever.
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn emit(&self, event: RuntimeEvent) {
        let _ = self.events.send(event);
    }

    /// Daemon streams currently held open.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn status_of(&self, reference: &str) -> Option<ContainerStatus> {
        self.containers
            .lock()
            .iter()
            .find(|c| matches(c, reference))
            .map(|c| c.summary.status)
    }

    fn allocate_id(&self) -> ContainerRef {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        ContainerRef::parse(&format!("{:012x}", 0xc0ffee000000_usize + n)).expect("valid id")
    }

    /// Count the call and apply the configured failure mode.
    async fn enter(&self, operation: &'static str) -> Result<(), String> {
        *self.calls.lock().entry(operation).or_default() += 1;

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err("connection refused".to_string());
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err("connection reset".to_string());
        }
        Ok(())
    }

    fn with_container<T>(
        &self,
        reference: &ContainerRef,
        f: impl FnOnce(&mut Container) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        let mut containers = self.containers.lock();
        let container = containers
            .iter_mut()
            .find(|c| matches(c, reference.as_str()))
            .ok_or_else(|| ContainerError::NotFound(format!("No such container: {reference}")))?;
        f(container)
    }
}

fn matches(container: &Container, reference: &str) -> bool {
    container.summary.name == reference
        || container.summary.id.as_str() == reference
        || (reference.len() >= 4 && container.summary.id.as_str().starts_with(reference))
}

#[async_trait]
impl ContainerOps for MockRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerRef, ContainerError> {
        self.enter("create").await.map_err(ContainerError::Unreachable)?;

        if !self.images.lock().contains(config.image.as_str()) {
            return Err(ContainerError::ImageNotFound(format!(
                "No such image: {}",
                config.image
            )));
        }

        let mut containers = self.containers.lock();
        if containers
            .iter()
            .any(|c| c.summary.name == config.name.as_str())
        {
            return Err(ContainerError::AlreadyExists(format!(
                "Conflict. The container name \"/{}\" is already in use",
                config.name
            )));
        }

        let id = self.allocate_id();
        containers.push(Container {
            summary: ContainerSummary {
                id: id.clone(),
                name: config.name.to_string(),
                image: config.image.to_string(),
                status: ContainerStatus::Created,
                created: Some(Utc::now()),
                command: config.command.as_ref().map(|c| c.join(" ")),
                labels: config.labels.clone(),
                ports: config
                    .ports
                    .iter()
                    .map(|p| PublishedPort {
                        container_port: p.container_port,
                        protocol: p.protocol.to_string(),
                        host_ip: p.host_port.map(|_| "0.0.0.0".to_string()),
                        host_port: p.host_port,
                    })
                    .collect(),
            },
            logs: Vec::new(),
            tail: LogTail::End,
            removing: false,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerRef) -> Result<(), ContainerError> {
        self.enter("start").await.map_err(ContainerError::Unreachable)?;
        self.with_container(id, |c| match c.summary.status {
            ContainerStatus::Running => Err(ContainerError::AlreadyRunning(
                "container already started".to_string(),
            )),
            ContainerStatus::Removing | ContainerStatus::Dead => Err(ContainerError::Conflict(
                "container is marked for removal".to_string(),
            )),
            _ => {
                c.summary.status = ContainerStatus::Running;
                Ok(())
            }
        })
    }

    async fn stop_container(
        &self,
        id: &ContainerRef,
        _timeout: std::time::Duration,
    ) -> Result<(), ContainerError> {
        self.enter("stop").await.map_err(ContainerError::Unreachable)?;
        self.with_container(id, |c| {
            if c.summary.status.is_running() {
                c.summary.status = ContainerStatus::Exited;
                Ok(())
            } else {
                Err(ContainerError::NotRunning(
                    "container already stopped".to_string(),
                ))
            }
        })
    }

    async fn remove_container(
        &self,
        id: &ContainerRef,
        force: bool,
    ) -> Result<(), ContainerError> {
        self.enter("remove").await.map_err(ContainerError::Unreachable)?;

        let mut containers = self.containers.lock();
        let index = containers
            .iter()
            .position(|c| matches(c, id.as_str()))
            .ok_or_else(|| ContainerError::NotFound(format!("No such container: {id}")))?;

        let container = &containers[index];
        if container.removing {
            return Err(ContainerError::RemovalInProgress(format!(
                "removal of container {id} is already in progress"
            )));
        }
        if container.summary.status.is_running() && !force {
            return Err(ContainerError::Conflict(
                "cannot remove a running container".to_string(),
            ));
        }

        containers.remove(index);
        Ok(())
    }

    async fn inspect_container(
        &self,
        id: &ContainerRef,
    ) -> Result<ContainerSummary, ContainerError> {
        self.enter("inspect").await.map_err(ContainerError::Unreachable)?;
        self.with_container(id, |c| Ok(c.summary.clone()))
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.enter("list").await.map_err(ContainerError::Unreachable)?;
        if self.stopping.load(Ordering::SeqCst) {
            return Err(ContainerError::Runtime(
                "unknown variant `stopping`".to_string(),
            ));
        }

        Ok(self
            .containers
            .lock()
            .iter()
            .map(|c| &c.summary)
            .filter(|s| filters.all || s.status.is_running())
            .filter(|s| {
                filters
                    .name
                    .as_ref()
                    .is_none_or(|name| s.name.contains(name.as_str()))
            })
            .filter(|s| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| s.labels.get(k).is_some_and(|actual| v.is_empty() || actual == v))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ImageOps for MockRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.enter("pull").await.map_err(ImageError::Unreachable)?;
        if reference.name().starts_with("missing") {
            return Err(ImageError::NotFound(reference.to_string()));
        }
        self.images.lock().insert(reference.to_string());
        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        self.enter("image_exists")
            .await
            .map_err(ImageError::Unreachable)?;
        Ok(self.images.lock().contains(reference.as_str()))
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError> {
        self.enter("list_images")
            .await
            .map_err(ImageError::Unreachable)?;
        Ok(self
            .images
            .lock()
            .iter()
            .enumerate()
            .map(|(n, image)| {
                let (repository, tag) = ImageSummary::split_repo_tag(image);
                ImageSummary {
                    repository,
                    tag: if tag.is_empty() { "latest".to_string() } else { tag },
                    id: format!("sha256:{:064x}", n + 1),
                    created: Some(Utc::now()),
                    size: 1024 * (n as i64 + 1),
                }
            })
            .collect())
    }

    async fn remove_image(&self, reference: &ImageRef, force: bool) -> Result<(), ImageError> {
        self.enter("remove_image")
            .await
            .map_err(ImageError::Unreachable)?;

        let mut images = self.images.lock();
        if !images.contains(reference.as_str()) {
            return Err(ImageError::NotFound(format!(
                "No such image: {}",
                reference
            )));
        }
        let in_use = self
            .containers
            .lock()
            .iter()
            .any(|c| c.summary.image == reference.as_str());
        if in_use && !force {
            return Err(ImageError::InUse(format!(
                "conflict: unable to remove repository reference \"{}\" - container is using its referenced image",
                reference
            )));
        }
        images.remove(reference.as_str());
        Ok(())
    }
}

#[async_trait]
impl NetworkOps for MockRuntime {
    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError> {
        self.enter("list_networks")
            .await
            .map_err(NetworkError::Unreachable)?;
        Ok(["bridge", "host", "none"]
            .iter()
            .enumerate()
            .map(|(n, name)| NetworkSummary {
                id: format!("{:064x}", n + 1),
                name: name.to_string(),
                driver: if *name == "none" { "null" } else { *name }.to_string(),
                scope: "local".to_string(),
                created: Some(Utc::now()),
                internal: false,
                attachable: false,
                ingress: false,
            })
            .collect())
    }
}

#[async_trait]
impl LogOps for MockRuntime {
    async fn container_logs(
        &self,
        id: &ContainerRef,
        opts: &LogOptions,
    ) -> Result<LogChunkStream, LogError> {
        self.enter("logs").await.map_err(LogError::Unreachable)?;

        let (lines, tail) = self
            .with_container(id, |c| Ok((c.logs.clone(), c.tail)))
            .map_err(|_| LogError::ContainerNotFound(id.to_string()))?;

        let mut lines: Vec<LogChunk> = lines
            .into_iter()
            .filter(|chunk| match chunk.stream {
                nocli::runtime::LogStream::Stdout => opts.stdout,
                nocli::runtime::LogStream::Stderr => opts.stderr,
            })
            .collect();
        if let Some(n) = opts.tail {
            let skip = lines.len().saturating_sub(n as usize);
            lines.drain(..skip);
        }

        let guard = SubscriptionGuard::new(&self.subscriptions);
        let head = futures::stream::iter(lines.into_iter().map(Ok));
        let rest: LogChunkStream = match (tail, opts.follow) {
            (LogTail::Open, true) => Box::pin(futures::stream::pending()),
            (LogTail::Fail, _) => Box::pin(futures::stream::once(async {
                Err(LogError::Unreachable("connection reset by peer".to_string()))
            })),
            _ => Box::pin(futures::stream::empty()),
        };

        Ok(Box::pin(head.chain(rest).map(move |item| {
            let _held = &guard;
            item
        })))
    }
}

#[async_trait]
impl EventOps for MockRuntime {
    async fn events(&self, filter: &EventFilter) -> Result<EventStream, EventError> {
        self.enter("events").await.map_err(EventError::Unreachable)?;

        let guard = SubscriptionGuard::new(&self.subscriptions);
        let filter = filter.clone();
        let rx = self.events.subscribe();

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((Ok(event), rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .filter(move |item: &Result<RuntimeEvent, EventError>| {
            let keep = match item {
                Ok(event) => {
                    (filter.types.is_empty() || filter.types.contains(&event.kind))
                        && (filter.actions.is_empty() || filter.actions.contains(&event.action))
                        && (filter.containers.is_empty()
                            || filter.containers.contains(&event.actor)
                            || event
                                .attributes
                                .get("name")
                                .is_some_and(|n| filter.containers.contains(n)))
                }
                Err(_) => true,
            };
            futures::future::ready(keep)
        })
        .map(move |item| {
            let _held = &guard;
            item
        });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl RuntimeInfo for MockRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        self.enter("info")
            .await
            .map_err(RuntimeInfoError::ConnectionFailed)?;
        Ok(RuntimeMetadata {
            name: "mock".to_string(),
            version: "1.0.0".to_string(),
            api_version: "1.45".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.enter("ping")
            .await
            .map_err(RuntimeInfoError::ConnectionFailed)
    }
}

/// A container lifecycle event as the daemon would report it.
pub fn container_event(action: &str, id: &ContainerRef, name: &str) -> RuntimeEvent {
    RuntimeEvent {
        kind: "container".to_string(),
        action: action.to_string(),
        actor: id.to_string(),
        attributes: HashMap::from([("name".to_string(), name.to_string())]),
        time: Some(Utc::now()),
    }
}
