//! Action submission — validate, stamp, fan out, record.
//!
//! DESIGN
//! ======
//! Everything after validation happens while holding the room's mutex:
//! stamping, materializing, enqueueing to every member, and appending to
//! history. Two concurrent submissions to the same table therefore reach
//! every member, and the history, in one identical order.
//!
//! ERROR HANDLING
//! ==============
//! A rejected draft is never broadcast. Members evicted during fan-out are
//! logged; if that empties the room it is dropped afterwards.

use frames::frame::{EVENT_RECEIVE_ACTION, now_ms};
use frames::{Action, ActionDraft, Author, ErrorCode, Frame, ValidationError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not joined to table {0}")]
    NotJoined(String),
}

impl ErrorCode for ActionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::NotJoined(_) => "E_NOT_JOINED",
        }
    }
}

/// Submit a draft on behalf of `author`, who must currently sit in the
/// draft's table through `connection_id`.
///
/// # Errors
///
/// `Validation` for drafts that break a rule, `NotJoined` when the sender is
/// not a member of the target table.
pub async fn submit_action(
    state: &AppState,
    author: &Author,
    connection_id: Uuid,
    joined_table: Option<&str>,
    draft: ActionDraft,
) -> Result<Action, ActionError> {
    let validated = draft.validate()?;
    validated.check_author(author)?;

    let table_id = validated.table_id().to_owned();
    if joined_table != Some(table_id.as_str()) {
        return Err(ActionError::NotJoined(table_id));
    }
    let Some(handle) = state.rooms.room(&table_id).await else {
        return Err(ActionError::NotJoined(table_id));
    };

    let mut room = handle.lock().await;
    if !room.contains(connection_id) {
        return Err(ActionError::NotJoined(table_id));
    }

    let timestamp = room.next_timestamp(now_ms());
    let action = validated.into_action(author, timestamp);
    let frame = Frame::request(EVENT_RECEIVE_ACTION, action.to_data())
        .with_table_id(&table_id)
        .with_from(&author.user_id);

    let evicted = room.fan_out(&frame);
    state.history.record(&action).await;
    let remaining = room.len();
    drop(room);

    info!(
        %table_id,
        action_id = %action.id,
        action_type = %action.action_type,
        recipients = remaining,
        "action: broadcast"
    );
    if !evicted.is_empty() {
        warn!(%table_id, evicted = evicted.len(), "action: evicted disconnected members");
        if remaining == 0 {
            state.rooms.drop_if_empty(&table_id).await;
        }
    }

    Ok(action)
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
