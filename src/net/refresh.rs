//! Single-flight coordination for session refresh.
//!
//! DESIGN
//! ======
//! `Idle -> Refreshing -> Idle`, re-entrant. The first caller to observe a 401
//! flips `is_refreshing` and becomes the leader; it drives exactly one refresh
//! network call. Every 401 observed while the flag is set (the leader's own
//! included) parks a [`PendingRequest`] in the FIFO queue instead of issuing a
//! second refresh, so replay order is exactly 401-arrival order.
//!
//! TRADE-OFFS
//! ==========
//! The leader drains and replays the queue itself rather than waking each
//! waiter to replay its own call; that serializes the replays but is what
//! makes the FIFO guarantee real instead of scheduler-dependent.

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use super::api::RequestSpec;

/// One request that hit a 401 while a refresh was pending (or that triggered
/// the refresh). Created on the 401, destroyed when the refresh settles.
pub(crate) struct PendingRequest {
    pub spec: RequestSpec,
    pub done: oneshot::Sender<Replay>,
}

/// What the leader reports back to a parked request.
pub(crate) enum Replay {
    /// The refresh succeeded and the original call was replayed once; this is
    /// the replay's outcome, still unclassified.
    Response(Result<reqwest::Response, reqwest::Error>),
    /// The refresh failed; the session is already cleared.
    AuthFailed,
}

struct RefreshState {
    is_refreshing: bool,
    queue: Vec<PendingRequest>,
}

/// Owner of the single-flight flag and the pending queue.
#[derive(Clone)]
pub(crate) struct RefreshCoordinator {
    inner: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RefreshState { is_refreshing: false, queue: Vec::new() })),
        }
    }

    /// Park a 401-ed request. Returns whether the caller became the leader
    /// (and must drive the refresh) plus the channel its outcome arrives on.
    ///
    /// The flag check and the enqueue happen under one lock; that is the whole
    /// single-flight guarantee.
    pub(crate) async fn enlist(&self, spec: RequestSpec) -> (bool, oneshot::Receiver<Replay>) {
        let (done, rx) = oneshot::channel();
        let mut state = self.inner.lock().await;
        state.queue.push(PendingRequest { spec, done });
        let leads = !state.is_refreshing;
        state.is_refreshing = true;
        (leads, rx)
    }

    /// Leave `Refreshing`, handing the queued requests (in arrival order) to
    /// the leader for replay or rejection.
    pub(crate) async fn settle(&self) -> Vec<PendingRequest> {
        let mut state = self.inner.lock().await;
        state.is_refreshing = false;
        std::mem::take(&mut state.queue)
    }

    #[cfg(test)]
    pub(crate) async fn is_refreshing(&self) -> bool {
        self.inner.lock().await.is_refreshing
    }

    #[cfg(test)]
    pub(crate) async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }
}
