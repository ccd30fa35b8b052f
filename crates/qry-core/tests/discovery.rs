//! Store discovery through `Database::connect`.

use std::sync::Arc;

use qry_core::{ConnectOptions, Database, Discovery, Messenger};

fn options(dir: &std::path::Path, tool: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(tool);
    options.discovery = Discovery::with_shared_path(dir.join("shared").join("ecosystem.sqlite"));
    options.fallback_database = dir.join(tool).join("context.sqlite");
    options
}

#[tokio::test]
async fn tools_meet_in_the_shared_store() {
    let dir = tempfile::tempdir().expect("tempdir");

    let writer = Database::connect(&options(dir.path(), "wherewasi"))
        .await
        .expect("connect writer");
    assert!(writer.is_shared());
    writer
        .track_project("demo", "/tmp/demo", "wherewasi", false)
        .await
        .expect("track");

    let reader = Database::connect(&options(dir.path(), "uroboro"))
        .await
        .expect("connect reader");
    assert!(reader.is_shared());
    assert_eq!(reader.path(), writer.path());
    assert!(reader.get_project("demo").await.expect("get").is_some());

    writer.close().await;
    reader.close().await;
}

#[tokio::test]
async fn force_local_keeps_tools_apart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut local = options(dir.path(), "wherewasi");
    local.force_local = true;
    let db = Database::connect(&local).await.expect("connect");

    assert!(!db.is_shared());
    assert_eq!(db.path(), dir.path().join("wherewasi").join("context.sqlite"));
    assert!(!dir.path().join("shared").exists());
    db.close().await;
}

#[tokio::test]
async fn unreachable_shared_store_falls_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("shared"), b"not a directory").expect("write blocker");

    let db = Database::connect(&options(dir.path(), "uroboro"))
        .await
        .expect("connect");

    assert!(!db.is_shared());
    assert_eq!(db.path(), dir.path().join("uroboro").join("context.sqlite"));
    db.close().await;
}

#[tokio::test]
async fn explicit_database_skips_discovery() {
    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = dir.path().join("nested").join("custom.sqlite");

    let mut opts = options(dir.path(), "wherewasi");
    opts.database = Some(explicit.clone());
    let db = Database::connect(&opts).await.expect("connect");

    assert!(!db.is_shared());
    assert_eq!(db.path(), explicit.as_path());
    assert!(!dir.path().join("shared").exists());
    db.close().await;
}

#[tokio::test]
async fn explicit_shared_path_is_reported_as_shared() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut opts = options(dir.path(), "uroboro");
    opts.database = Some(opts.discovery.shared_path().to_path_buf());
    let db = Database::connect(&opts).await.expect("connect");

    assert!(db.is_shared());
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn connect_and_write_from_spawned_tasks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let opts = options(dir.path(), "examinator");

    let db = tokio::spawn(async move { Database::connect(&opts).await })
        .await
        .expect("join")
        .expect("connect");
    let db = Arc::new(db);

    let mut handles = Vec::new();
    for i in 0..4 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            db.track_project(&format!("project-{i}"), "/tmp", "examinator", false)
                .await?;
            let id = Messenger::new(&db)
                .send("examinator", "uroboro", "alert", "{}")
                .await?;
            Ok::<_, qry_core::Error>(id)
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    assert_eq!(db.get_recent_projects(10).await.expect("recent").len(), 4);
    assert_eq!(Messenger::new(&db).drain("uroboro").await.expect("drain").len(), 4);
}
