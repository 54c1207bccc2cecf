//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, redeems the ticket for an identity, generates a connection ID
//! and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by event name
//! - Room fan-out frames from the connection's channel → forward to client
//!
//! Handler functions validate, touch state, and return an `Outcome`. Room
//! fan-out is the one exception: `send_action` enqueues `receive_action` to
//! every member (the sender included) under the room lock, so its outcome
//! only carries the acknowledgement.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `connected` with connection ID and session identity
//! 2. `join` → seat in the room, reply with recent history
//! 3. `send_action` → validate, stamp, fan out, acknowledge
//! 4. Close → leave the room (dropped if now empty)

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::frame::{EVENT_CONNECTED, EVENT_GATEWAY_ERROR, EVENT_JOIN, EVENT_LEAVE, EVENT_SEND_ACTION};
use frames::{ActionDraft, Author, Data, Frame, Status, ValidationError};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::action::submit_action;
use crate::services::room::Member;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer turns it into
/// the reply for the sender.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
}

/// Per-connection state threaded through dispatch.
pub(crate) struct ConnectionContext {
    pub connection_id: Uuid,
    pub author: Author,
    /// Table this connection currently sits in.
    pub table_id: Option<String>,
    /// Sender half of the connection's outbound queue, handed to rooms.
    pub tx: mpsc::Sender<Frame>,
}

impl ConnectionContext {
    pub(crate) fn new(author: Author, tx: mpsc::Sender<Frame>) -> Self {
        Self { connection_id: Uuid::new_v4(), author, table_id: None, tx }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(ticket) = params.get("ticket") else {
        return (StatusCode::UNAUTHORIZED, "ticket required").into_response();
    };

    let Some(author) = state.sessions.consume(ticket) else {
        return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response();
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, author))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, author: Author) {
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);
    let mut ctx = ConnectionContext::new(author, client_tx);

    let welcome = connected_frame(&ctx);
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(connection_id = %ctx.connection_id, user_id = %ctx.author.user_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_inbound_text(&state, &mut ctx, &text).await {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    leave_current(&state, &mut ctx).await;
    info!(connection_id = %ctx.connection_id, "ws: client disconnected");
}

fn connected_frame(ctx: &ConnectionContext) -> Frame {
    Frame::request(EVENT_CONNECTED, Data::new())
        .with_data("connection_id", ctx.connection_id.to_string())
        .with_data("user_id", ctx.author.user_id.clone())
        .with_data("nickname", ctx.author.nickname.clone())
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Transport concerns stay in `run_ws`, so tests can drive dispatch with a
/// bare `ConnectionContext` and inspect room channels directly.
pub(crate) async fn process_inbound_text(state: &AppState, ctx: &mut ConnectionContext, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(connection_id = %ctx.connection_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request(EVENT_GATEWAY_ERROR, Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Identity comes from the session, never from the frame.
    req.from = Some(ctx.author.user_id.clone());

    info!(connection_id = %ctx.connection_id, id = %req.id, event = %req.event, "ws: recv frame");

    if req.status != Status::Request {
        return vec![req.error(format!("expected a request, got {:?}", req.status))];
    }

    let result = match req.event.as_str() {
        EVENT_JOIN => handle_join(state, ctx, &req).await,
        EVENT_LEAVE => Ok(handle_leave(state, ctx).await),
        EVENT_SEND_ACTION => handle_send_action(state, ctx, &req).await,
        other => Err(req.error(format!("unknown event: {other}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_join(state: &AppState, ctx: &mut ConnectionContext, req: &Frame) -> Result<Outcome, Frame> {
    let Some(raw_table_id) = table_id_from(req) else {
        return Err(req.error_from(&ValidationError::EmptyTableId));
    };

    // The announced nickname is informational; the session one is kept.
    if let Some(claimed) = req.data.get("nickname").and_then(|v| v.as_str()) {
        if claimed != ctx.author.nickname {
            warn!(connection_id = %ctx.connection_id, claimed, "ws: join nickname differs from session");
        }
    }

    let member = Member { user_id: ctx.author.user_id.clone(), nickname: ctx.author.nickname.clone(), tx: ctx.tx.clone() };

    let table_id = frames::action::validate_table_id(&raw_table_id).map_err(|e| req.error_from(&e))?;
    if ctx.table_id.as_deref() != Some(table_id.as_str()) {
        leave_current(state, ctx).await;
    }

    let table_id = state
        .rooms
        .join(&table_id, ctx.connection_id, member)
        .await
        .map_err(|e| req.error_from(&e))?;
    ctx.table_id = Some(table_id.clone());

    let history = state.history.recent(&table_id).await;
    let members: Vec<serde_json::Value> = state
        .rooms
        .members(&table_id)
        .await
        .into_iter()
        .map(|m| serde_json::json!({ "user_id": m.user_id, "nickname": m.nickname }))
        .collect();

    let history = serde_json::to_value(&history).unwrap_or_else(|e| {
        warn!(%table_id, error = %e, "ws: failed to serialize join history");
        serde_json::Value::Array(Vec::new())
    });

    let mut reply = Data::new();
    reply.insert("table_id".into(), serde_json::json!(table_id));
    reply.insert("history".into(), history);
    reply.insert("members".into(), serde_json::json!(members));
    Ok(Outcome::Reply(reply))
}

async fn handle_leave(state: &AppState, ctx: &mut ConnectionContext) -> Outcome {
    leave_current(state, ctx).await;
    Outcome::Done
}

async fn handle_send_action(state: &AppState, ctx: &ConnectionContext, req: &Frame) -> Result<Outcome, Frame> {
    let mut data = req.data.clone();
    if !data.contains_key("table_id") {
        if let Some(table_id) = &req.table_id {
            data.insert("table_id".into(), serde_json::json!(table_id));
        }
    }
    let draft = ActionDraft::from_data(&data).map_err(|e| req.error_from(&e))?;

    let action = submit_action(state, &ctx.author, ctx.connection_id, ctx.table_id.as_deref(), draft)
        .await
        .map_err(|e| req.error_from(&e))?;

    let mut reply = Data::new();
    reply.insert("id".into(), serde_json::json!(action.id));
    reply.insert("timestamp".into(), serde_json::json!(action.timestamp));
    Ok(Outcome::Reply(reply))
}

// =============================================================================
// HELPERS
// =============================================================================

/// `table_id` from the payload (string or number), else from the envelope.
fn table_id_from(req: &Frame) -> Option<String> {
    match req.data.get("table_id") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => req.table_id.clone(),
    }
}

async fn leave_current(state: &AppState, ctx: &mut ConnectionContext) {
    if let Some(table_id) = ctx.table_id.take() {
        state.rooms.leave(&table_id, ctx.connection_id).await;
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame
            .data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let message = frame.error_message().unwrap_or("-");
        warn!(id = %frame.id, event = %frame.event, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, event = %frame.event, status = ?frame.status, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
