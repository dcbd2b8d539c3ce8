//! The protected-view session guard.
//!
//! DESIGN
//! ======
//! `Checking -> Allowed | Denied` per navigation. A confirmed cached profile
//! short-circuits to `Allowed` with no network call. When an identity
//! provider is configured, its own initialization gates the evaluation and a
//! provider-side "not authenticated" denies without wasting a guaranteed-401
//! who-am-i round trip. Otherwise exactly one deduplicated who-am-i call
//! decides.
//!
//! TRADE-OFFS
//! ==========
//! The shared fetch runs as a detached task: a caller that navigates away
//! just drops its future, the fetch still settles exactly once, and the
//! profile cache is updated at most once. A non-auth fetch failure arms a
//! short hold-off so a down backend costs one call per window, not one per
//! navigation attempt.

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::net::api::ApiClient;
use crate::net::types::Employee;
use crate::notice::{Notice, NoticeSender};
use crate::session::provider::{AuthProvider, SessionHandle};

/// Outcome of one guard evaluation.
#[derive(Debug, Clone)]
pub enum GuardDecision {
    /// Render the protected view for this person.
    Allowed(Employee),
    /// Redirect to the login view (a `RedirectToLogin` notice has been sent).
    Denied,
}

#[derive(Debug, Clone)]
enum FetchOutcome {
    Allowed(Employee),
    Denied,
}

struct GuardState {
    inflight: Option<watch::Receiver<Option<FetchOutcome>>>,
    holdoff_until: Option<Instant>,
}

struct GuardShared {
    api: ApiClient,
    auth: AuthProvider,
    session: SessionHandle,
    notices: NoticeSender,
    holdoff: Duration,
    state: Mutex<GuardState>,
}

/// Per-navigation gate for protected views. Cheap to clone.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardShared>,
}

impl SessionGuard {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        api: ApiClient,
        auth: AuthProvider,
        session: SessionHandle,
        notices: NoticeSender,
    ) -> Self {
        Self {
            inner: Arc::new(GuardShared {
                api,
                auth,
                session,
                notices,
                holdoff: config.profile_holdoff,
                state: Mutex::new(GuardState { inflight: None, holdoff_until: None }),
            }),
        }
    }

    /// Evaluate the gate for one protected navigation. Suspends while the
    /// answer is unknown; the caller renders its loading placeholder until
    /// this returns.
    pub async fn check(&self) -> GuardDecision {
        if let Some(profile) = self.inner.session.profile().await {
            if profile.has_identity() {
                return GuardDecision::Allowed(profile);
            }
        }

        let auth = self.inner.auth.ensure_initialized().await;
        if auth.configured && !auth.authenticated {
            return self.deny();
        }

        match self.fetch_profile().await {
            FetchOutcome::Allowed(profile) => GuardDecision::Allowed(profile),
            FetchOutcome::Denied => self.deny(),
        }
    }

    fn deny(&self) -> GuardDecision {
        let _ = self.inner.notices.send(Notice::RedirectToLogin);
        GuardDecision::Denied
    }

    /// Who-am-i, shared across overlapping checks: the first caller spawns the
    /// fetch, everyone else waits on the same outcome.
    async fn fetch_profile(&self) -> FetchOutcome {
        let mut rx = {
            let mut state = self.inner.state.lock().await;

            // A fetch that settled while we waited on the lock may have
            // cached a profile already.
            if let Some(profile) = self.inner.session.profile().await {
                if profile.has_identity() {
                    return FetchOutcome::Allowed(profile);
                }
            }

            if let Some(until) = state.holdoff_until {
                if Instant::now() < until {
                    return FetchOutcome::Denied;
                }
                state.holdoff_until = None;
            }

            if let Some(rx) = &state.inflight {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                state.inflight = Some(rx.clone());
                let guard = self.clone();
                tokio::spawn(async move { guard.run_fetch(&tx).await });
                rx
            }
        };

        match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone().unwrap_or(FetchOutcome::Denied),
            Err(_) => FetchOutcome::Denied,
        }
    }

    async fn run_fetch(&self, tx: &watch::Sender<Option<FetchOutcome>>) {
        let mut arm_holdoff = false;
        let outcome = match self.inner.api.me().await {
            Ok(profile) if profile.has_identity() => {
                self.inner.session.adopt_profile(profile.clone()).await;
                FetchOutcome::Allowed(profile)
            }
            Ok(_) => {
                tracing::warn!("who-am-i returned a profile without an identifier");
                self.inner.session.clear_profile().await;
                FetchOutcome::Denied
            }
            // A definitive "not signed in"; no point holding off the retry.
            Err(ApiError::AuthRequired) => {
                self.inner.session.clear_profile().await;
                FetchOutcome::Denied
            }
            Err(e) => {
                tracing::warn!(error = %e, "who-am-i failed");
                self.inner.session.clear_profile().await;
                arm_holdoff = true;
                FetchOutcome::Denied
            }
        };

        let mut state = self.inner.state.lock().await;
        state.inflight = None;
        if arm_holdoff {
            state.holdoff_until = Some(Instant::now() + self.inner.holdoff);
        }
        drop(state);
        let _ = tx.send(Some(outcome));
    }

    #[cfg(test)]
    pub(crate) async fn holdoff_active(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.holdoff_until.is_some_and(|until| Instant::now() < until)
    }
}
