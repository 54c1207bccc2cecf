use std::time::Duration;

use clap::{Parser, Subcommand};
use client::{ClientContext, Composer, Feed};
use frames::frame::{EVENT_CONNECTED, EVENT_JOIN, EVENT_LEAVE, EVENT_SEND_ACTION};
use frames::{Action, Data, Frame, Status, ValidationError};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session request rejected ({status}): {message}")]
    Session { status: u16, message: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {event}: {message}")]
    ServerError { event: String, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
    #[error("nothing to send")]
    EmptyMessage,
    #[error("message rejected: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Parser, Debug)]
#[command(name = "tablechat", about = "Terminal client for tablechat tables")]
struct Cli {
    #[arg(long, env = "TABLECHAT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "TABLECHAT_TABLE", default_value = "lobby")]
    table: String,

    #[arg(long, env = "TABLECHAT_NICKNAME", default_value = "guest")]
    nickname: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Join the table and chat interactively (default).
    Chat,
    /// Send one message (or `/roll ...`) and print its broadcast.
    Say { message: Vec<String> },
    /// Print the table's recent actions.
    History {
        /// Render the feed as an HTML list instead of terminal lines.
        #[arg(long)]
        html: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Ping => run_ping(&base_url).await,
        Command::Chat => run_chat(&base_url, &cli.table, &cli.nickname).await,
        Command::Say { message } => run_say(&base_url, &cli.table, &cli.nickname, &message.join(" ")).await,
        Command::History { html } => run_history(&base_url, &cli.table, html).await,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let response = reqwest::Client::new()
        .get(format!("{base_url}/healthz"))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            event: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_history(base_url: &str, table: &str, html: bool) -> Result<(), CliError> {
    let mut url = reqwest::Url::parse(base_url).map_err(|_| CliError::InvalidBaseUrl(base_url.to_owned()))?;
    url.path_segments_mut()
        .map_err(|()| CliError::InvalidBaseUrl(base_url.to_owned()))?
        .pop_if_empty()
        .extend(["api", "tables", table, "actions"]);

    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or_default();
        return Err(CliError::ServerError { event: format!("HTTP {}", status.as_u16()), message: error_text(&body) });
    }
    let actions: Vec<Action> = response.json().await?;

    let mut feed = Feed::new();
    feed.load_history(&actions);
    if html {
        println!("{}", feed.to_html());
        return Ok(());
    }
    for entry in feed.entries() {
        println!("{entry}");
    }
    Ok(())
}

async fn run_say(base_url: &str, table: &str, nickname: &str, message: &str) -> Result<(), CliError> {
    let (ctx, mut stream) = open_session(base_url, table, nickname).await?;
    let mut feed = Feed::new();
    join_table(&mut stream, &ctx, &mut feed).await?;

    let mut composer = Composer::new(ctx);
    composer.set_input(message);
    let draft = composer.submit()?.ok_or(CliError::EmptyMessage)?;
    let request_id = send_request(&mut stream, EVENT_SEND_ACTION, draft.to_data()).await?;
    let ack = wait_for_terminal_response(&mut stream, request_id, EVENT_SEND_ACTION).await?;
    let action_id = ack.data.get("id").and_then(Value::as_str).ok_or(CliError::MissingField("id"))?;

    // The sender's own copy arrives through fan-out, like everyone else's.
    loop {
        let frame = recv_next(&mut stream, Duration::from_secs(5)).await?;
        if feed.apply_frame(&frame) {
            if let Some(entry) = feed.entries().last().filter(|e| e.id.to_string() == action_id) {
                println!("{entry}");
                break;
            }
        }
    }

    let _ = stream.close(None).await;
    Ok(())
}

async fn run_chat(base_url: &str, table: &str, nickname: &str) -> Result<(), CliError> {
    let (ctx, mut stream) = open_session(base_url, table, nickname).await?;
    let mut feed = Feed::new();
    join_table(&mut stream, &ctx, &mut feed).await?;
    for entry in feed.entries() {
        println!("{entry}");
    }
    eprintln!("joined {} as {}; type {QUIT_COMMAND} to leave", ctx.table_id, ctx.nickname);

    let mut composer = Composer::new(ctx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == QUIT_COMMAND {
                    break;
                }
                composer.set_input(line);
                match composer.submit() {
                    Ok(Some(draft)) => {
                        send_request(&mut stream, EVENT_SEND_ACTION, draft.to_data()).await?;
                    }
                    Ok(None) => {}
                    Err(error) => eprintln!("error: {error}"),
                }
            }
            msg = stream.next() => {
                let Some(msg) = msg else { break };
                match msg.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                    Message::Text(text) => {
                        let frame: Frame = serde_json::from_str(text.as_str())?;
                        render_frame(&mut feed, &frame);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    let _ = send_request(&mut stream, EVENT_LEAVE, Data::new()).await;
    let _ = stream.close(None).await;
    Ok(())
}

// =============================================================================
// SESSION
// =============================================================================

async fn open_session(base_url: &str, table: &str, nickname: &str) -> Result<(ClientContext, WsStream), CliError> {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/session"))
        .json(&serde_json::json!({ "nickname": nickname }))
        .send()
        .await?;
    let status = response.status();
    let body: Value = response.json().await?;
    if !status.is_success() {
        return Err(CliError::Session { status: status.as_u16(), message: error_text(&body) });
    }

    let field = |key: &'static str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(CliError::MissingField(key))
    };
    let ticket = field("ticket")?;
    let ctx = ClientContext::new(table, field("user_id")?, field("nickname")?);

    let url = ws_url(base_url, &ticket)?;
    let (mut stream, _) = connect_async(url.as_str())
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;
    wait_for_connected(&mut stream).await?;
    Ok((ctx, stream))
}

async fn join_table(stream: &mut WsStream, ctx: &ClientContext, feed: &mut Feed) -> Result<(), CliError> {
    let mut data = Data::new();
    data.insert("table_id".into(), Value::String(ctx.table_id.clone()));
    data.insert("nickname".into(), Value::String(ctx.nickname.clone()));
    let request_id = send_request(stream, EVENT_JOIN, data).await?;
    let reply = wait_for_terminal_response(stream, request_id, EVENT_JOIN).await?;
    feed.apply_frame(&reply);
    Ok(())
}

fn ws_url(base_url: &str, ticket: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws?ticket={ticket}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws?ticket={ticket}"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

// =============================================================================
// FRAMES
// =============================================================================

/// Print whatever the frame adds to the feed; errors go to stderr.
fn render_frame(feed: &mut Feed, frame: &Frame) {
    if frame.status == Status::Error {
        eprintln!("error: {}", error_text(&Value::Object(frame.data.clone())));
        return;
    }
    let is_backfill = frame.event == EVENT_JOIN;
    if !feed.apply_frame(frame) {
        return;
    }
    if is_backfill {
        for entry in feed.entries() {
            println!("{entry}");
        }
    } else if let Some(entry) = feed.entries().last() {
        println!("{entry}");
    }
}

fn error_text(body: &Value) -> String {
    let message = body.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    match body.get("code").and_then(Value::as_str) {
        Some(code) => format!("{code}: {message}"),
        None => message.to_owned(),
    }
}

async fn send_request(stream: &mut WsStream, event: &str, data: Data) -> Result<Uuid, CliError> {
    let frame = Frame::request(event, data);
    let json = serde_json::to_string(&frame)?;
    stream
        .send(Message::Text(json.into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;
    Ok(frame.id)
}

async fn wait_for_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.event == EVENT_CONNECTED {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(stream: &mut WsStream, request_id: Uuid, event: &str) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id != Some(request_id) || frame.event != event || !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                event: frame.event.clone(),
                message: error_text(&Value::Object(frame.data)),
            });
        }
        return Ok(frame);
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).map_err(CliError::from);
                }
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
