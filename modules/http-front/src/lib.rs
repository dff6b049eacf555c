//! axum HTTP front-end: one route per controller operation, JSON
//! envelope responses, and the status-code mapping from the error
//! taxonomy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use registry_ctrl::Controller;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct AppState {
    ctrl: Arc<Controller>,
}

#[derive(Debug, Deserialize)]
struct NameAndAddress {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct NameOnly {
    #[serde(default)]
    name: String,
}

fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "data": data }))).into_response()
}

fn err(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

fn status_for(e: &registry_ctrl::Error) -> StatusCode {
    match e {
        registry_ctrl::Error::NotFound => StatusCode::NOT_FOUND,
        registry_ctrl::Error::AlreadyExists => StatusCode::CONFLICT,
        registry_ctrl::Error::DecodeRequest => StatusCode::BAD_REQUEST,
        registry_ctrl::Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn map_err(e: registry_ctrl::Error) -> Response {
    let status = status_for(&e);
    err(status, e)
}

async fn health_check() -> Response {
    ok(StatusCode::OK, "OK")
}

async fn register(State(state): State<AppState>, body: Result<Json<NameAndAddress>, axum::extract::rejection::JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    if req.name.is_empty() || req.address.is_empty() {
        return err(StatusCode::BAD_REQUEST, registry_ctrl::Error::DecodeRequest);
    }

    match state.ctrl.register(&req.name, &req.address).await {
        Ok(()) => ok(StatusCode::CREATED, "OK"),
        Err(e) => map_err(e),
    }
}

async fn deregister(State(state): State<AppState>, body: Result<Json<NameAndAddress>, axum::extract::rejection::JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    if req.name.is_empty() || req.address.is_empty() {
        return err(StatusCode::BAD_REQUEST, registry_ctrl::Error::DecodeRequest);
    }

    match state.ctrl.deregister(&req.name, &req.address).await {
        Ok(()) => ok(StatusCode::OK, "OK"),
        Err(e) => map_err(e),
    }
}

async fn find(State(state): State<AppState>, body: Result<Json<NameOnly>, axum::extract::rejection::JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    if req.name.is_empty() {
        return err(StatusCode::BAD_REQUEST, registry_ctrl::Error::DecodeRequest);
    }

    match state.ctrl.find_service_by_name(&req.name).await {
        Ok(address) => ok(StatusCode::OK, address),
        Err(e) => map_err(e),
    }
}

async fn list_services(State(state): State<AppState>) -> Response {
    match state.ctrl.list_services().await {
        Ok(names) => ok(StatusCode::OK, names),
        Err(e) => map_err(e),
    }
}

async fn list_addrs(State(state): State<AppState>, body: Result<Json<NameOnly>, axum::extract::rejection::JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(e) => return err(StatusCode::BAD_REQUEST, e),
    };
    if req.name.is_empty() {
        return err(StatusCode::BAD_REQUEST, registry_ctrl::Error::DecodeRequest);
    }

    match state.ctrl.list_addrs(&req.name).await {
        Ok(addrs) => ok(StatusCode::OK, addrs),
        Err(e) => map_err(e),
    }
}

pub fn router(ctrl: Arc<Controller>) -> Router {
    let state = AppState { ctrl };

    Router::new()
        .route("/health-check", get(health_check))
        .route("/register", post(register))
        .route("/deregister", post(deregister))
        .route("/find", post(find))
        .route("/list-svcs", get(list_services))
        .route("/list-addrs", post(list_addrs))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the HTTP front-end on `port` until `cancel` fires.
pub async fn serve(ctrl: Arc<Controller>, port: u16, cancel: CancellationToken) -> anyhow::Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http front-end listening");

    axum::serve(listener, router(ctrl))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
