//! Table routes — active-table directory and a read-only view of a table's
//! recent actions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use frames::Action;
use frames::action::validate_table_id;

use crate::routes::error_response;
use crate::services::room::TableSummary;
use crate::state::AppState;

/// `GET /api/tables` — tables with at least one member, by id.
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.rooms.tables().await)
}

/// `GET /api/tables/{table_id}/actions` — recent actions, oldest first.
///
/// # Errors
///
/// `400` for blank or malformed table ids.
pub async fn list_actions(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<Vec<Action>>, Response> {
    let table_id = validate_table_id(&table_id).map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    Ok(Json(state.history.recent(&table_id).await))
}

#[cfg(test)]
#[path = "tables_test.rs"]
mod tests;
