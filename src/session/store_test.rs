use super::*;

use std::path::PathBuf;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("hrdesk-store-{}.json", uuid::Uuid::new_v4()))
}

fn sample() -> StoredSession {
    StoredSession {
        token: "t1".to_owned(),
        user_id: "u1".to_owned(),
        roles: vec!["EMPLOYEE".to_owned()],
        refresh_token: None,
    }
}

#[tokio::test]
async fn file_store_roundtrip() {
    let path = temp_path();
    let store = FileStore::new(path.clone());

    assert!(store.load().await.is_none());
    store.save(&sample()).await.expect("save");
    assert_eq!(store.load().await, Some(sample()));

    store.clear().await.expect("clear");
    assert!(store.load().await.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn file_store_malformed_content_is_absent() {
    let path = temp_path();
    tokio::fs::write(&path, "{not json").await.expect("write");

    let store = FileStore::new(path.clone());
    assert!(store.load().await.is_none());

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn file_store_clear_is_idempotent() {
    let store = FileStore::new(temp_path());
    store.clear().await.expect("clearing nothing is fine");
    store.clear().await.expect("still fine");
}

#[tokio::test]
async fn file_store_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("hrdesk-store-dir-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("session.json");
    let store = FileStore::new(path.clone());

    store.save(&sample()).await.expect("save");
    assert!(store.load().await.is_some());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[test]
fn stored_session_wire_format_is_camel_case() {
    let json = serde_json::to_value(sample()).expect("encode");
    assert_eq!(json["token"], "t1");
    assert_eq!(json["userId"], "u1");
    // no refresh token -> key omitted entirely
    assert!(json.get("refreshToken").is_none());
}

#[tokio::test]
async fn memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert!(store.load().await.is_none());
    store.save(&sample()).await.expect("save");
    assert_eq!(store.load().await, Some(sample()));
    store.clear().await.expect("clear");
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn memory_store_seeded_starts_populated() {
    let store = MemoryStore::seeded(sample());
    assert_eq!(store.load().await, Some(sample()));
}
