use super::*;
use frames::Data;
use tokio::time::{Duration, timeout};

fn member(user_id: &str, tx: mpsc::Sender<Frame>) -> Member {
    Member { user_id: user_id.into(), nickname: format!("nick-{user_id}"), tx }
}

async fn recv_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed")
}

// =============================================================================
// Room
// =============================================================================

#[test]
fn new_room_is_empty() {
    let room = Room::default();
    assert!(room.is_empty());
    assert_eq!(room.len(), 0);
}

#[test]
fn timestamps_never_go_backwards() {
    let mut room = Room::default();
    assert_eq!(room.next_timestamp(100), 100);
    assert_eq!(room.next_timestamp(90), 100);
    assert_eq!(room.next_timestamp(100), 100);
    assert_eq!(room.next_timestamp(101), 101);
}

#[tokio::test]
async fn fan_out_reaches_every_member() {
    let mut room = Room::default();
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(4);
    room.members.insert(Uuid::new_v4(), member("a", tx_a));
    room.members.insert(Uuid::new_v4(), member("b", tx_b));

    let frame = Frame::request("receive_action", Data::new());
    assert!(room.fan_out(&frame).is_empty());

    assert_eq!(recv_frame(&mut rx_a).await.id, frame.id);
    assert_eq!(recv_frame(&mut rx_b).await.id, frame.id);
}

#[tokio::test]
async fn fan_out_evicts_closed_members_only() {
    let mut room = Room::default();
    let healthy = Uuid::new_v4();
    let closed = Uuid::new_v4();

    let (tx_ok, mut rx_ok) = mpsc::channel(4);
    let (tx_closed, rx_closed) = mpsc::channel(4);
    drop(rx_closed);

    room.members.insert(healthy, member("ok", tx_ok));
    room.members.insert(closed, member("closed", tx_closed));

    let evicted = room.fan_out(&Frame::request("receive_action", Data::new()));

    assert_eq!(evicted, vec![closed]);
    assert!(room.contains(healthy));
    assert_eq!(room.len(), 1);
    recv_frame(&mut rx_ok).await;
}

#[tokio::test]
async fn full_queue_skips_frame_but_keeps_seat() {
    let mut room = Room::default();
    let slow = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(1);
    room.members.insert(slow, member("slow", tx));

    let first = Frame::request("receive_action", Data::new());
    let skipped = Frame::request("receive_action", Data::new());
    let later = Frame::request("receive_action", Data::new());

    assert!(room.fan_out(&first).is_empty());
    assert!(room.fan_out(&skipped).is_empty());
    assert!(room.contains(slow));

    assert_eq!(recv_frame(&mut rx).await.id, first.id);
    assert!(room.fan_out(&later).is_empty());
    assert_eq!(recv_frame(&mut rx).await.id, later.id);
}

#[test]
fn ensure_room_returns_existing_room() {
    let mut rooms = HashMap::new();
    let a = ensure_room(&mut rooms, "cave");
    let b = ensure_room(&mut rooms, "cave");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(rooms.len(), 1);
}

// =============================================================================
// RoomRegistry
// =============================================================================

#[tokio::test]
async fn join_creates_room_implicitly() {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(4);
    let conn = Uuid::new_v4();

    let table_id = registry.join(" cave ", conn, member("a", tx)).await.unwrap();

    assert_eq!(table_id, "cave");
    assert_eq!(registry.room_count().await, 1);
    let members = registry.members("cave").await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].connection_id, conn);
    assert_eq!(members[0].nickname, "nick-a");
}

#[tokio::test]
async fn join_rejects_blank_table_id() {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(4);

    let err = registry.join("   ", Uuid::new_v4(), member("a", tx)).await.unwrap_err();

    assert_eq!(err, ValidationError::EmptyTableId);
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn join_rejects_malformed_table_id() {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(4);
    assert!(registry.join("bad\u{0}id", Uuid::new_v4(), member("a", tx)).await.is_err());
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn rejoin_is_idempotent() {
    let registry = RoomRegistry::new();
    let conn = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(4);

    registry.join("cave", conn, member("a", tx.clone())).await.unwrap();
    registry.join("cave", conn, member("a", tx)).await.unwrap();

    assert_eq!(registry.members("cave").await.len(), 1);
}

#[tokio::test]
async fn leave_keeps_room_with_other_members() {
    let registry = RoomRegistry::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (tx_a, _rx_a) = mpsc::channel(4);
    let (tx_b, _rx_b) = mpsc::channel(4);
    registry.join("cave", a, member("a", tx_a)).await.unwrap();
    registry.join("cave", b, member("b", tx_b)).await.unwrap();

    assert!(registry.leave("cave", a).await);

    let members = registry.members("cave").await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].connection_id, b);
}

#[tokio::test]
async fn last_leave_drops_room() {
    let registry = RoomRegistry::new();
    let conn = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(4);
    registry.join("cave", conn, member("a", tx)).await.unwrap();

    assert!(registry.leave("cave", conn).await);

    assert_eq!(registry.room_count().await, 0);
    assert!(registry.room("cave").await.is_none());
    assert!(registry.members("cave").await.is_empty());
}

#[tokio::test]
async fn leave_unknown_room_or_member_is_harmless() {
    let registry = RoomRegistry::new();
    assert!(!registry.leave("nowhere", Uuid::new_v4()).await);

    let (tx, _rx) = mpsc::channel(4);
    registry.join("cave", Uuid::new_v4(), member("a", tx)).await.unwrap();
    assert!(!registry.leave("cave", Uuid::new_v4()).await);
    assert_eq!(registry.room_count().await, 1);
}

#[tokio::test]
async fn drop_if_empty_only_drops_empty_rooms() {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(4);
    registry.join("busy", Uuid::new_v4(), member("a", tx.clone())).await.unwrap();
    let idle = Uuid::new_v4();
    registry.join("idle", idle, member("b", tx)).await.unwrap();
    registry.room("idle").await.unwrap().lock().await.members.remove(&idle);

    registry.drop_if_empty("busy").await;
    registry.drop_if_empty("idle").await;

    assert!(registry.room("busy").await.is_some());
    assert!(registry.room("idle").await.is_none());
}

#[tokio::test]
async fn tables_lists_active_rooms_with_member_counts() {
    let registry = RoomRegistry::new();
    let (tx, _rx) = mpsc::channel(4);
    registry.join("forest", Uuid::new_v4(), member("a", tx.clone())).await.unwrap();
    registry.join("cave", Uuid::new_v4(), member("b", tx.clone())).await.unwrap();
    registry.join("cave", Uuid::new_v4(), member("c", tx)).await.unwrap();

    let tables = registry.tables().await;

    assert_eq!(
        tables,
        [
            TableSummary { table_id: "cave".into(), members: 2 },
            TableSummary { table_id: "forest".into(), members: 1 },
        ]
    );
}
