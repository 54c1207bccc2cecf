use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request(EVENT_JOIN, Data::new());
    assert_eq!(frame.event, "join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.table_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request(EVENT_SEND_ACTION, Data::new()).with_table_id("dungeon");
    let done = req.done();

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.table_id.as_deref(), Some("dungeon"));
    assert_eq!(done.event, "send_action");
    assert_eq!(done.status, Status::Done);
    assert!(done.data.is_empty());
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
}

#[test]
fn parses_minimal_client_frame() {
    let id = Uuid::new_v4();
    let text = format!(r#"{{"id":"{id}","event":"join","status":"request","data":{{"table_id":"7"}}}}"#);
    let frame: Frame = serde_json::from_str(&text).expect("minimal frame should parse");

    assert_eq!(frame.id, id);
    assert_eq!(frame.event, "join");
    assert_eq!(frame.ts, 0);
    assert_eq!(frame.data.get("table_id").and_then(|v| v.as_str()), Some("7"));
}

#[test]
fn optional_fields_are_omitted_on_the_wire() {
    let frame = Frame::request(EVENT_LEAVE, Data::new());
    let json = serde_json::to_value(&frame).expect("serialize");
    let obj = json.as_object().expect("frame serializes as object");

    assert!(!obj.contains_key("parent_id"));
    assert!(!obj.contains_key("table_id"));
    assert!(!obj.contains_key("from"));
    assert_eq!(obj.get("status").and_then(|v| v.as_str()), Some("request"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not joined")]
    struct NotJoined;

    impl ErrorCode for NotJoined {
        fn error_code(&self) -> &'static str {
            "E_NOT_JOINED"
        }
    }

    let req = Frame::request(EVENT_SEND_ACTION, Data::new());
    let err = req.error_from(&NotJoined);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_NOT_JOINED"));
    assert_eq!(err.error_message(), Some("not joined"));
    assert_eq!(err.data.get("retryable").and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn error_message_is_none_for_non_error_frames() {
    let req = Frame::request(EVENT_JOIN, Data::new()).with_data("message", "hi");
    assert!(req.error_message().is_none());
}
