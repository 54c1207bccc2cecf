use super::*;
use frames::{ActionDraft, Author};

#[test]
fn ws_url_maps_http_schemes() {
    assert_eq!(ws_url("http://127.0.0.1:3000", "abc").unwrap(), "ws://127.0.0.1:3000/api/ws?ticket=abc");
    assert_eq!(ws_url("https://chat.example", "abc").unwrap(), "wss://chat.example/api/ws?ticket=abc");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://nope", "abc"), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn error_text_prefers_code_and_message() {
    let body = serde_json::json!({ "code": "E_NOT_JOINED", "message": "not joined to table cave" });
    assert_eq!(error_text(&body), "E_NOT_JOINED: not joined to table cave");
    assert_eq!(error_text(&serde_json::json!({})), "unknown error");
}

#[test]
fn render_frame_feeds_receive_action() {
    let author = Author { user_id: "u-1".into(), nickname: "Ann".into() };
    let action = ActionDraft::chat("u-1", "cave", "hi").validate().unwrap().into_action(&author, 0);
    let frame = Frame::request(frames::frame::EVENT_RECEIVE_ACTION, action.to_data());
    let mut feed = Feed::new();

    render_frame(&mut feed, &frame);
    render_frame(&mut feed, &frame.error("ignored"));

    assert_eq!(feed.len(), 1);
}

#[test]
fn history_accepts_html_flag() {
    let cli = Cli::try_parse_from(["tablechat", "--table", "cave", "history", "--html"]).unwrap();
    assert!(matches!(cli.command, Some(Command::History { html: true })));
    assert_eq!(cli.table, "cave");
}
