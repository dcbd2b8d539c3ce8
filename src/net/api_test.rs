use super::*;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::notice;
use crate::session::provider::SessionHandle;
use crate::session::store::MemoryStore;

// =============================================================================
// extract_message — backend error payload shapes
// =============================================================================

#[test]
fn extract_message_enveloped_form() {
    let body = r#"{"error":{"message":"Employee not found"}}"#;
    assert_eq!(extract_message(body).as_deref(), Some("Employee not found"));
}

#[test]
fn extract_message_flat_form() {
    let body = r#"{"message":"Invalid request"}"#;
    assert_eq!(extract_message(body).as_deref(), Some("Invalid request"));
}

#[test]
fn extract_message_envelope_wins_over_flat() {
    let body = r#"{"error":{"message":"inner"},"message":"outer"}"#;
    assert_eq!(extract_message(body).as_deref(), Some("inner"));
}

#[test]
fn extract_message_garbage_is_none() {
    assert!(extract_message("<html>nope</html>").is_none());
    assert!(extract_message("").is_none());
    assert!(extract_message(r#"{"unrelated":true}"#).is_none());
}

// =============================================================================
// RequestSpec
// =============================================================================

#[test]
fn request_spec_defaults_to_authenticated() {
    let spec = RequestSpec::get("/employee/me");
    assert_eq!(spec.method, Method::GET);
    assert!(!spec.anonymous);
    assert!(spec.body.is_none());
}

#[test]
fn into_anonymous_marks_spec() {
    let spec = RequestSpec::post("/auth/login", None).into_anonymous();
    assert!(spec.anonymous);
}

// =============================================================================
// terminal_auth — notice gating
// =============================================================================

struct StubTokens;

#[async_trait]
impl TokenSource for StubTokens {
    async fn bearer_token(&self) -> Option<String> {
        None
    }

    async fn invalidate(&self) {}
}

fn rig() -> (ApiClient, SessionHandle, Arc<MemoryStore>, crate::notice::NoticeReceiver) {
    let config = ClientConfig::new("http://127.0.0.1:1/api");
    let http = build_http_client(&config);
    let (tx, rx) = notice::channel();
    let session = SessionHandle::default();
    let store = Arc::new(MemoryStore::new());
    let client = ApiClient::new(&config, http, session.clone(), store.clone(), Arc::new(StubTokens), tx);
    (client, session, store, rx)
}

fn drain(rx: &mut crate::notice::NoticeReceiver) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

#[tokio::test]
async fn terminal_auth_on_live_session_notifies_once() {
    let (client, session, store, mut rx) = rig();
    let data = SessionData {
        token: Some("t1".to_owned()),
        user_id: "u1".to_owned(),
        roles: vec![],
        refresh_token: None,
    };
    client.adopt_session(&data).await;
    assert!(store.load().await.is_some());

    client.terminal_auth().await;

    assert!(store.load().await.is_none());
    assert!(!session.snapshot().await.authenticated);
    let notices = drain(&mut rx);
    assert_eq!(notices, vec![Notice::SessionExpired, Notice::RedirectToLogin]);
}

#[tokio::test]
async fn terminal_auth_when_signed_out_is_silent() {
    let (client, _session, store, mut rx) = rig();
    client.terminal_auth().await;
    assert!(store.load().await.is_none());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn terminal_auth_twice_notifies_once() {
    let (client, _session, _store, mut rx) = rig();
    let data = SessionData {
        token: Some("t1".to_owned()),
        user_id: "u1".to_owned(),
        roles: vec![],
        refresh_token: None,
    };
    client.adopt_session(&data).await;

    client.terminal_auth().await;
    client.terminal_auth().await;

    let notices = drain(&mut rx);
    assert_eq!(
        notices.iter().filter(|n| **n == Notice::SessionExpired).count(),
        1
    );
}

#[tokio::test]
async fn adopt_session_mirrors_to_store() {
    let (client, session, store, _rx) = rig();
    let data = SessionData {
        token: Some("t1".to_owned()),
        user_id: "u1".to_owned(),
        roles: vec!["EMPLOYEE".to_owned()],
        refresh_token: Some("rt1".to_owned()),
    };
    client.adopt_session(&data).await;

    let stored = store.load().await.expect("persisted");
    assert_eq!(stored.token, "t1");
    assert_eq!(stored.user_id, "u1");
    assert_eq!(stored.refresh_token.as_deref(), Some("rt1"));

    let snapshot = session.snapshot().await;
    assert!(snapshot.authenticated);
    assert_eq!(snapshot.token.as_deref(), Some("t1"));
}
