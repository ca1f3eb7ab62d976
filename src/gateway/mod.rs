// ABOUTME: Operation gateway between HTTP handlers and the runtime adapter.
// ABOUTME: Validates input, enforces deadlines, retries reads, and applies idempotency rules.

mod error;
mod request;
mod retry;

pub use error::{ApiError, ErrorDetail, default_message, status_for};
pub use request::{
    CreateRequest, ListQuery, QueryPairs, RemoveQuery, StopQuery, event_filter_from_pairs,
    log_options_from_pairs, parse_image, parse_ref,
};
pub use retry::{READ_RETRY_BACKOFF, read_with_retry};

use crate::config::Config;
use crate::runtime::{
    ContainerError, ContainerSummary, Deadline, EventStream, ImageError, ImageSummary,
    LogChunkStream, NetworkSummary, Runtime, RuntimeMetadata,
};
use crate::types::{ContainerRef, ImageRef};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Prefix for names the gateway generates for unnamed containers.
pub const GENERATED_NAME_PREFIX: &str = "nocli-";

#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    pub request_timeout: Duration,
    pub stop_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout,
            stop_timeout: config.stop_timeout,
            retry_backoff: READ_RETRY_BACKOFF,
        }
    }
}

/// `201` body for a created container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    #[serde(rename = "ref")]
    pub reference: ContainerRef,
    pub name: ContainerRef,
}

/// Final state reported after a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Running,
    Stopped,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    #[serde(rename = "ref")]
    pub reference: ContainerRef,
    pub status: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRemoved {
    pub image: ImageRef,
    pub status: Outcome,
}

/// Generate `nocli-<8 hex>`.
pub fn generate_name() -> ContainerRef {
    ContainerRef::generate(GENERATED_NAME_PREFIX)
}

#[derive(Clone)]
pub struct Gateway {
    runtime: Arc<dyn Runtime>,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(runtime: Arc<dyn Runtime>, settings: GatewaySettings) -> Self {
        Self { runtime, settings }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.settings.request_timeout)
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<ContainerSummary>, ApiError> {
        let filters = query.into_filters();
        read_with_retry(&self.deadline(), self.settings.retry_backoff, "list", || {
            self.runtime.list_containers(&filters)
        })
        .await
        .map_err(|e| ApiError::from_adapter(&e, "list"))
    }

    pub async fn inspect(&self, raw_ref: &str) -> Result<ContainerSummary, ApiError> {
        let id = parse_ref(raw_ref)?;
        self.inspect_ref(&id, &self.deadline()).await
    }

    async fn inspect_ref(
        &self,
        id: &ContainerRef,
        deadline: &Deadline,
    ) -> Result<ContainerSummary, ApiError> {
        read_with_retry(deadline, self.settings.retry_backoff, "inspect", || {
            self.runtime.inspect_container(id)
        })
        .await
        .map_err(|e| ApiError::from_adapter(&e, "inspect").with_ref(id.clone()))
    }

    pub async fn info(&self) -> Result<RuntimeMetadata, ApiError> {
        read_with_retry(&self.deadline(), self.settings.retry_backoff, "info", || {
            self.runtime.info()
        })
        .await
        .map_err(|e| ApiError::from_adapter(&e, "info"))
    }

    /// Create a container. The name is fixed before the daemon call, so every
    /// failure, timeouts included, carries it back.
    pub async fn create(&self, request: CreateRequest) -> Result<Created, ApiError> {
        let pull = request.pull;
        let config = request.into_config(generate_name)?;
        let name = config.name.clone();

        let result = self
            .deadline()
            .run(async {
                if pull {
                    self.ensure_image(&config.image).await?;
                }
                self.runtime
                    .create_container(&config)
                    .await
                    .map_err(|e| match e {
                        ContainerError::ImageNotFound(_) => {
                            ApiError::from_adapter(&e, "create").with_message("image not found")
                        }
                        ContainerError::AlreadyExists(_) => ApiError::from_adapter(&e, "create")
                            .with_message("container name already in use"),
                        _ => ApiError::from_adapter(&e, "create"),
                    })
            })
            .await;

        match result {
            Ok(id) => {
                tracing::info!("Created container {} ({})", name, id);
                Ok(Created {
                    reference: id,
                    name,
                })
            }
            Err(e) => Err(e.with_ref(name)),
        }
    }

    async fn ensure_image(&self, image: &ImageRef) -> Result<(), ApiError> {
        let exists = self
            .runtime
            .image_exists(image)
            .await
            .map_err(|e| ApiError::from_adapter(&e, "image_exists"))?;
        if exists {
            return Ok(());
        }

        tracing::info!("Pulling image {}", image);
        self.runtime.pull_image(image).await.map_err(|e| match e {
            ImageError::NotFound(_) => {
                ApiError::from_adapter(&e, "pull").with_message("image not found")
            }
            _ => ApiError::from_adapter(&e, "pull"),
        })
    }

    /// Start a container. Already running is success.
    pub async fn start(&self, raw_ref: &str) -> Result<ActionResult, ApiError> {
        let id = parse_ref(raw_ref)?;
        let result = self
            .deadline()
            .run(self.runtime.start_container(&id))
            .await;

        match result {
            Ok(()) => tracing::info!("Started container {}", id),
            Err(ContainerError::AlreadyRunning(_)) => {
                tracing::debug!("Container {} already running", id)
            }
            Err(e) => return Err(ApiError::from_adapter(&e, "start").with_ref(id)),
        }

        Ok(ActionResult {
            reference: id,
            status: Outcome::Running,
        })
    }

    /// Stop a container. Already stopped is success.
    pub async fn stop(&self, raw_ref: &str, query: StopQuery) -> Result<ActionResult, ApiError> {
        let id = parse_ref(raw_ref)?;
        let grace = query.timeout.unwrap_or(self.settings.stop_timeout);
        if grace >= self.settings.request_timeout {
            return Err(ApiError::bad_request(format!(
                "timeout must be shorter than the request timeout ({}s)",
                self.settings.request_timeout.as_secs()
            ))
            .with_ref(id));
        }

        let result = self
            .deadline()
            .run(self.runtime.stop_container(&id, grace))
            .await;

        match result {
            Ok(()) => tracing::info!("Stopped container {}", id),
            Err(ContainerError::NotRunning(_)) => {
                tracing::debug!("Container {} already stopped", id)
            }
            Err(e) => return Err(ApiError::from_adapter(&e, "stop").with_ref(id)),
        }

        Ok(ActionResult {
            reference: id,
            status: Outcome::Stopped,
        })
    }

    /// Remove a container. Removal already in progress is success; an unknown
    /// ref is NotFound.
    pub async fn remove(
        &self,
        raw_ref: &str,
        query: RemoveQuery,
    ) -> Result<ActionResult, ApiError> {
        let id = parse_ref(raw_ref)?;
        let result = self
            .deadline()
            .run(self.runtime.remove_container(&id, query.force))
            .await;

        match result {
            Ok(()) => tracing::info!("Removed container {}", id),
            Err(ContainerError::RemovalInProgress(_)) => {
                tracing::debug!("Container {} removal already in progress", id)
            }
            Err(e) => return Err(ApiError::from_adapter(&e, "remove").with_ref(id)),
        }

        Ok(ActionResult {
            reference: id,
            status: Outcome::Removed,
        })
    }

    pub async fn list_images(&self) -> Result<Vec<ImageSummary>, ApiError> {
        read_with_retry(
            &self.deadline(),
            self.settings.retry_backoff,
            "list_images",
            || self.runtime.list_images(),
        )
        .await
        .map_err(|e| ApiError::from_adapter(&e, "list_images"))
    }

    /// Remove a local image. Unlike container removal there is no in-progress
    /// state to absorb: unknown is NotFound, still used is Conflict.
    pub async fn remove_image(
        &self,
        raw_image: &str,
        query: RemoveQuery,
    ) -> Result<ImageRemoved, ApiError> {
        let image = parse_image(raw_image)?;
        self.deadline()
            .run(self.runtime.remove_image(&image, query.force))
            .await
            .map_err(|e| match e {
                ImageError::NotFound(_) => {
                    ApiError::from_adapter(&e, "remove_image").with_message("image not found")
                }
                ImageError::InUse(_) => ApiError::from_adapter(&e, "remove_image")
                    .with_message("image is in use by a container"),
                _ => ApiError::from_adapter(&e, "remove_image"),
            })?;

        tracing::info!("Removed image {}", image);
        Ok(ImageRemoved {
            image,
            status: Outcome::Removed,
        })
    }

    pub async fn list_networks(&self) -> Result<Vec<NetworkSummary>, ApiError> {
        read_with_retry(
            &self.deadline(),
            self.settings.retry_backoff,
            "list_networks",
            || self.runtime.list_networks(),
        )
        .await
        .map_err(|e| ApiError::from_adapter(&e, "list_networks"))
    }

    /// Open a log stream. The container is inspected first so an unknown ref
    /// fails with NotFound instead of an empty stream.
    pub async fn open_logs(
        &self,
        raw_ref: &str,
        pairs: &[(String, String)],
    ) -> Result<(ContainerRef, LogChunkStream), ApiError> {
        let id = parse_ref(raw_ref)?;
        let opts = log_options_from_pairs(pairs).map_err(|e| e.with_ref(id.clone()))?;
        let deadline = self.deadline();

        self.inspect_ref(&id, &deadline).await?;

        let stream = deadline
            .run(self.runtime.container_logs(&id, &opts))
            .await
            .map_err(|e| ApiError::from_adapter(&e, "logs").with_ref(id.clone()))?;

        Ok((id, stream))
    }

    /// Open an event stream. The daemon is pinged first so an unreachable
    /// daemon fails the request instead of the stream.
    pub async fn open_events(&self, pairs: &[(String, String)]) -> Result<EventStream, ApiError> {
        let filter = event_filter_from_pairs(pairs)?;
        let deadline = self.deadline();

        read_with_retry(&deadline, self.settings.retry_backoff, "ping", || {
            self.runtime.ping()
        })
        .await
        .map_err(|e| ApiError::from_adapter(&e, "ping"))?;

        deadline
            .run(self.runtime.events(&filter))
            .await
            .map_err(|e| ApiError::from_adapter(&e, "events"))
    }
}
