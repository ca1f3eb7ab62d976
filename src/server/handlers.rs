// ABOUTME: HTTP handlers for the management API.
// ABOUTME: Thin adapters from axum extractors to gateway and session manager calls.

use super::AppState;
use crate::gateway::{
    ActionResult, ApiError, CreateRequest, Created, ImageRemoved, ListQuery, QueryPairs,
    RemoveQuery, StopQuery, parse_ref,
};
use crate::health::HealthStatus;
use crate::runtime::{ContainerSummary, ErrorKind, ImageSummary, NetworkSummary, RuntimeMetadata};
use crate::stream::{self, SessionBody, SessionKind};
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

type ApiResult<T> = Result<T, ApiError>;

pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = state.health.check().await;
    let code = if status.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

pub async fn info(State(state): State<AppState>) -> ApiResult<Json<RuntimeMetadata>> {
    state.gateway.info().await.map(Json)
}

pub async fn list_containers(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Json<Vec<ContainerSummary>>> {
    let Query(pairs) = query?;
    let query = ListQuery::from_pairs(&pairs)?;
    state.gateway.list(query).await.map(Json)
}

pub async fn create_container(
    State(state): State<AppState>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(request) = body?;
    let created = state.gateway.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn inspect_container(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<ContainerSummary>> {
    state.gateway.inspect(&reference).await.map(Json)
}

pub async fn start_container(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<ActionResult>> {
    state.gateway.start(&reference).await.map(Json)
}

pub async fn stop_container(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Json<ActionResult>> {
    let Query(pairs) = query?;
    let query = StopQuery::from_pairs(&pairs)?;
    state.gateway.stop(&reference, query).await.map(Json)
}

pub async fn remove_container(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Json<ActionResult>> {
    let Query(pairs) = query?;
    let query = RemoveQuery::from_pairs(&pairs)?;
    state.gateway.remove(&reference, query).await.map(Json)
}

pub async fn list_images(State(state): State<AppState>) -> ApiResult<Json<Vec<ImageSummary>>> {
    state.gateway.list_images().await.map(Json)
}

pub async fn remove_image(
    State(state): State<AppState>,
    Path(image): Path<String>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Json<ImageRemoved>> {
    let Query(pairs) = query?;
    let query = RemoveQuery::from_pairs(&pairs)?;
    state.gateway.remove_image(&image, query).await.map(Json)
}

pub async fn list_networks(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<NetworkSummary>>> {
    state.gateway.list_networks().await.map(Json)
}

pub async fn container_logs(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(pairs) = query?;
    let (container, logs) = state.gateway.open_logs(&reference, &pairs).await?;
    let body = state.sessions.open(SessionKind::Logs { container }, logs);
    Ok(ndjson(body))
}

pub async fn events(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(pairs) = query?;

    // Only a single container filter names the session's target
    let mut containers = pairs.iter().filter(|(k, _)| k == "container");
    let container = match (containers.next(), containers.next()) {
        (Some((_, value)), None) => Some(parse_ref(value)?),
        _ => None,
    };

    let events = state.gateway.open_events(&pairs).await?;
    let body = state.sessions.open(SessionKind::Events { container }, events);
    Ok(ndjson(body))
}

pub async fn not_found() -> ApiError {
    ApiError::new(ErrorKind::NotFound, "no such route")
}

fn ndjson(body: SessionBody) -> Response {
    let session_id = body.id().to_string();
    let mut response = Body::from_stream(body.into_byte_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(stream::CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        headers.insert("x-session-id", value);
    }
    response
}
