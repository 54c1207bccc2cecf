//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the HTTP and websocket endpoints under a single Axum
//! router: ticket issuance, the live socket, the active-table directory,
//! a read-only history view and a health probe.

pub mod session;
pub mod tables;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use frames::ErrorCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session", post(session::create_session))
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/tables", get(tables::list_tables))
        .route("/api/tables/{table_id}/actions", get(tables::list_actions))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// JSON error body shared by the HTTP routes.
pub(crate) fn error_response(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Response {
    let body = serde_json::json!({
        "code": err.error_code(),
        "message": err.to_string(),
        "retryable": err.retryable(),
    });
    (status, Json(body)).into_response()
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
