//! Session route — nickname in, WS ticket out.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::routes::error_response;
use crate::services::session::SessionError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub nickname: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub ticket: String,
    pub user_id: String,
    pub nickname: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, &self)
    }
}

/// `POST /api/session` — mint an identity and a one-time WS ticket.
///
/// # Errors
///
/// `400` with a structured body for blank or overlong nicknames.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<SessionResponse>, SessionError> {
    let (ticket, author) = state.sessions.issue(&body.nickname)?;
    info!(user_id = %author.user_id, nickname = %author.nickname, "session: ticket issued");
    Ok(Json(SessionResponse { ticket, user_id: author.user_id, nickname: author.nickname }))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
