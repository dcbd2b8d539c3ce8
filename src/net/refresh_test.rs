use super::*;

use crate::net::api::RequestSpec;

#[tokio::test]
async fn first_enlist_leads() {
    let coordinator = RefreshCoordinator::new();
    let (leads, _rx) = coordinator.enlist(RequestSpec::get("/a")).await;
    assert!(leads);
    assert!(coordinator.is_refreshing().await);
    assert_eq!(coordinator.queue_len().await, 1);
}

#[tokio::test]
async fn followers_enqueue_without_leading() {
    let coordinator = RefreshCoordinator::new();
    let (first, _rx1) = coordinator.enlist(RequestSpec::get("/a")).await;
    let (second, _rx2) = coordinator.enlist(RequestSpec::get("/b")).await;
    let (third, _rx3) = coordinator.enlist(RequestSpec::get("/c")).await;
    assert!(first);
    assert!(!second);
    assert!(!third);
    assert_eq!(coordinator.queue_len().await, 3);
}

#[tokio::test]
async fn settle_drains_in_arrival_order_and_reopens() {
    let coordinator = RefreshCoordinator::new();
    let (_, _rx1) = coordinator.enlist(RequestSpec::get("/a")).await;
    let (_, _rx2) = coordinator.enlist(RequestSpec::get("/b")).await;
    let (_, _rx3) = coordinator.enlist(RequestSpec::get("/c")).await;

    let pending = coordinator.settle().await;
    let order: Vec<&str> = pending.iter().map(|p| p.spec.path.as_str()).collect();
    assert_eq!(order, vec!["/a", "/b", "/c"]);
    assert!(!coordinator.is_refreshing().await);
    assert_eq!(coordinator.queue_len().await, 0);

    // terminal state is re-entrant: the next 401 leads a new cycle
    let (leads, _rx) = coordinator.enlist(RequestSpec::get("/d")).await;
    assert!(leads);
}

#[tokio::test]
async fn rejection_reaches_every_waiter() {
    let coordinator = RefreshCoordinator::new();
    let (_, rx1) = coordinator.enlist(RequestSpec::get("/a")).await;
    let (_, rx2) = coordinator.enlist(RequestSpec::get("/b")).await;

    for request in coordinator.settle().await {
        let _ = request.done.send(Replay::AuthFailed);
    }

    assert!(matches!(rx1.await, Ok(Replay::AuthFailed)));
    assert!(matches!(rx2.await, Ok(Replay::AuthFailed)));
}

#[tokio::test]
async fn enlist_during_drain_starts_fresh_cycle() {
    let coordinator = RefreshCoordinator::new();
    let (_, _rx) = coordinator.enlist(RequestSpec::get("/a")).await;
    let _pending = coordinator.settle().await;

    // a 401 arriving after settle is a new refresh, not a stale waiter
    let (leads, _rx2) = coordinator.enlist(RequestSpec::get("/b")).await;
    assert!(leads);
    assert_eq!(coordinator.queue_len().await, 1);
}
