//! Integration tests for the cross-tool message queue.

use std::path::PathBuf;

use qry_core::payload::{CaptureData, MessagePayload};
use qry_core::{ConnectOptions, Database, MessageType, Messenger, ToolName};
use uuid::Uuid;

fn temp_db_path() -> PathBuf {
    let mut path = std::env::temp_dir();
    let filename = format!("qry-messaging-test-{}.sqlite", Uuid::new_v4());
    path.push(filename);
    path
}

async fn connect(tool: &str) -> Database {
    let mut options = ConnectOptions::new(tool);
    options.database = Some(temp_db_path());
    Database::connect(&options).await.expect("connect")
}

#[tokio::test]
async fn end_to_end_context_and_messaging() {
    let db = connect("wherewasi").await;

    db.track_project("demo", "/tmp/demo", "wherewasi", true)
        .await
        .expect("track");
    db.save_context("demo", "ctx", "info", "kw")
        .await
        .expect("save");

    let recent = db.get_recent_contexts("demo", 5).await.expect("recent");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].session_info, "info");

    let messenger = Messenger::new(&db);
    messenger
        .send("wherewasi", "uroboro", "alert", "{}")
        .await
        .expect("send");

    let inbox = messenger.drain("uroboro").await.expect("drain");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from_tool, "wherewasi");
    assert!(!inbox[0].processed);

    messenger.mark_processed(inbox[0].id).await.expect("mark");
    assert!(messenger.drain("uroboro").await.expect("drain").is_empty());

    db.close().await;
}

#[tokio::test]
async fn send_rejects_unknown_tool_without_writing() {
    let db = connect("wherewasi").await;
    let messenger = Messenger::new(&db);

    let err = messenger
        .send("wherewasi", "nobody", "alert", "{}")
        .await
        .expect_err("unknown recipient");
    assert!(err.is_validation());
    assert!(err.to_string().contains("invalid to_tool"));

    let err = messenger
        .send("ghost", "uroboro", "alert", "{}")
        .await
        .expect_err("unknown sender");
    assert!(err.to_string().contains("invalid from_tool"));

    let err = messenger
        .send("wherewasi", "uroboro", "capture", r#"{"project":"demo"}"#)
        .await
        .expect_err("payload missing content");
    assert!(err.is_validation());

    assert!(messenger.drain("uroboro").await.expect("drain").is_empty());
    assert!(db.get_tool_message(1).await.expect("get").is_none());
}

#[tokio::test]
async fn drain_rejects_unknown_recipient() {
    let db = connect("wherewasi").await;

    let err = Messenger::new(&db)
        .drain("nobody")
        .await
        .expect_err("unknown recipient");
    assert!(err.is_validation());
}

#[tokio::test]
async fn drain_returns_oldest_first_and_skips_processed() {
    let db = connect("wherewasi").await;
    let messenger = Messenger::new(&db);

    let first = messenger
        .send("wherewasi", "examinator", "alert", r#"{"message":"one"}"#)
        .await
        .expect("send");
    let second = messenger
        .send("uroboro", "examinator", "alert", r#"{"message":"two"}"#)
        .await
        .expect("send");
    let third = messenger
        .send("qryai", "examinator", "alert", r#"{"message":"three"}"#)
        .await
        .expect("send");
    messenger
        .send("wherewasi", "uroboro", "alert", "{}")
        .await
        .expect("send elsewhere");

    messenger.mark_processed(second).await.expect("mark");

    let inbox = messenger.drain("examinator").await.expect("drain");
    let ids: Vec<i64> = inbox.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first, third]);
    assert!(inbox.iter().all(|m| !m.processed));
}

#[tokio::test]
async fn drain_orders_sqlite_formatted_timestamps_by_time() {
    let db = connect("wherewasi").await;
    let messenger = Messenger::new(&db);

    // Lower id, but stamped an hour later in SQLite's own format.
    db.execute(sqlx::query(
        "INSERT INTO tool_messages (from_tool, to_tool, message_type, data, created_at) VALUES ('qomoboro', 'uroboro', 'alert', '{}', strftime('%Y-%m-%d %H:%M:%S', 'now', '+1 hour'))",
    ))
    .await
    .expect("insert sibling");
    let ours = messenger
        .send("wherewasi", "uroboro", "alert", "{}")
        .await
        .expect("send");

    let inbox = messenger.drain("uroboro").await.expect("drain");
    let senders: Vec<&str> = inbox.iter().map(|m| m.from_tool.as_str()).collect();
    assert_eq!(senders, vec!["wherewasi", "qomoboro"]);
    assert_eq!(inbox[0].id, ours);
}

#[tokio::test]
async fn mark_processed_is_idempotent() {
    let db = connect("wherewasi").await;
    let messenger = Messenger::new(&db);

    let id = messenger
        .send("wherewasi", "uroboro", "alert", "{}")
        .await
        .expect("send");

    messenger.mark_processed(id).await.expect("mark");
    let first = db
        .get_tool_message(id)
        .await
        .expect("get")
        .expect("exists");
    assert!(first.processed);
    let first_at = first.processed_at.expect("processed_at");

    messenger.mark_processed(id).await.expect("mark again");
    let again = db
        .get_tool_message(id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(again.processed_at, Some(first_at));

    messenger.mark_processed(424_242).await.expect("mark missing");
}

#[tokio::test]
async fn typed_payloads_round_trip_through_the_queue() {
    let db = connect("uroboro").await;
    let messenger = Messenger::new(&db);

    let payload = MessagePayload::Capture(CaptureData {
        content: "sqlx pools are cheap to clone".to_string(),
        project: "demo".to_string(),
        tags: "rust".to_string(),
        context_session_id: None,
        metadata: None,
    });
    messenger
        .send_payload(ToolName::Uroboro, ToolName::Examinator, &payload)
        .await
        .expect("send");

    let inbox = messenger.drain("examinator").await.expect("drain");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message_type, MessageType::Capture.as_str());
    assert_eq!(inbox[0].payload().expect("payload"), payload);
}
