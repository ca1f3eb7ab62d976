// ABOUTME: HTTP server wiring: router, middleware, and graceful shutdown.
// ABOUTME: Shutdown closes streaming sessions before axum drains connections.

mod handlers;

use crate::config::Config;
use crate::gateway::{Gateway, GatewaySettings};
use crate::health::HealthMonitor;
use crate::runtime::Runtime;
use crate::stream::{SessionManager, StreamSettings};
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared per-server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub sessions: SessionManager,
    pub health: HealthMonitor,
}

impl AppState {
    pub fn new(runtime: Arc<dyn Runtime>, config: &Config) -> Self {
        Self {
            gateway: Gateway::new(runtime.clone(), GatewaySettings::from(config)),
            sessions: SessionManager::new(StreamSettings::from(config)),
            health: HealthMonitor::from_config(runtime, config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/info", get(handlers::info))
        .route(
            "/containers",
            get(handlers::list_containers).post(handlers::create_container),
        )
        .route("/containers/{ref}", get(handlers::inspect_container))
        .route("/containers/{ref}/start", post(handlers::start_container))
        .route("/containers/{ref}/stop", post(handlers::stop_container))
        .route("/containers/{ref}/remove", post(handlers::remove_container))
        .route("/containers/{ref}/logs", get(handlers::container_logs))
        .route("/images", get(handlers::list_images))
        .route("/images/{ref}/remove", post(handlers::remove_image))
        .route("/networks", get(handlers::list_networks))
        .route("/events", get(handlers::events))
        .fallback(handlers::not_found)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
///
/// On shutdown, streaming sessions are closed (waiting up to the configured
/// grace) before axum stops accepting and drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let sessions = state.sessions.clone();
    let grace = sessions.settings().shutdown_grace;
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("Shutdown requested");
            sessions.shutdown(grace).await;
        })
        .await
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
