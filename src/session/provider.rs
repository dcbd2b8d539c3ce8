//! Process-wide session state and the auth provider.
//!
//! ARCHITECTURE
//! ============
//! `SessionHandle` is the one shared mutable view of "who is signed in":
//! the credential, the confirmed profile, and the `authenticated` flag.
//! `AuthProvider` owns the lifecycle around it — identity-provider
//! initialization (memoized, bounded), login/logout, proactive token renewal,
//! and the startup restore flow. The durable store is only a mirror; nothing
//! here treats its contents as proof of authentication.

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::config::ClientConfig;
use crate::idp::{IdentityProvider, IdpTokens};
use crate::net::api::{ApiClient, TokenSource};
use crate::net::types::{Employee, SessionData};
use crate::notice::{Notice, NoticeSender};
use crate::session::store::{SessionStore, StoredSession};

pub(crate) const SSO_INIT_FAILED_MESSAGE: &str = "Failed to initialize single sign-on.";

// =============================================================================
// SESSION STATE
// =============================================================================

/// The client's belief about the current user.
///
/// Invariant: `authenticated == true` implies `token` and `user_id` are
/// present. Cookie-mode sessions confirmed only by a profile fetch keep
/// `authenticated == false` and are gated by profile presence instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Default)]
struct SessionCell {
    session: Session,
    profile: Option<Employee>,
}

/// Shared, lock-guarded session state. Cheap to clone.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionCell>>,
}

impl SessionHandle {
    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.session.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.session.token.clone()
    }

    /// The confirmed current-user profile, if any.
    pub async fn profile(&self) -> Option<Employee> {
        self.inner.read().await.profile.clone()
    }

    /// Adopt credentials from a login or refresh response.
    pub(crate) async fn establish(&self, data: &SessionData) {
        let mut cell = self.inner.write().await;
        let user_changed = cell
            .profile
            .as_ref()
            .is_some_and(|p| p.uuid.to_string() != data.user_id);
        if user_changed {
            cell.profile = None;
        }
        cell.session.token = data.token.clone();
        cell.session.user_id = Some(data.user_id.clone()).filter(|u| !u.is_empty());
        cell.session.roles = data.roles.clone();
        cell.session.authenticated = cell.session.token.is_some() && cell.session.user_id.is_some();
    }

    /// Swap in a provider-issued access token without touching identity.
    pub(crate) async fn set_token(&self, token: String) {
        let mut cell = self.inner.write().await;
        cell.session.token = Some(token);
        cell.session.authenticated = cell.session.user_id.is_some();
    }

    /// Restore credentials from the durable mirror. Does NOT mark the session
    /// authenticated — the store is never the source of truth for that.
    pub(crate) async fn hydrate(&self, stored: &StoredSession) {
        let mut cell = self.inner.write().await;
        cell.session.token = Some(stored.token.clone()).filter(|t| !t.is_empty());
        cell.session.user_id = Some(stored.user_id.clone()).filter(|u| !u.is_empty());
        cell.session.roles = stored.roles.clone();
        cell.session.authenticated = false;
    }

    /// Record a confirmed who-am-i result.
    pub(crate) async fn adopt_profile(&self, profile: Employee) {
        let mut cell = self.inner.write().await;
        cell.session.user_id = Some(profile.uuid.to_string());
        if cell.session.roles.is_empty() {
            cell.session.roles = profile.roles.clone();
        }
        cell.session.authenticated = cell.session.token.is_some();
        cell.profile = Some(profile);
    }

    pub(crate) async fn clear_profile(&self) {
        self.inner.write().await.profile = None;
    }

    /// Wipe everything. Returns whether there was anything to wipe, which is
    /// what gates the session-expired notice.
    pub(crate) async fn clear(&self) -> bool {
        let mut cell = self.inner.write().await;
        let had = cell.session.authenticated || cell.session.token.is_some() || cell.profile.is_some();
        cell.session = Session::default();
        cell.profile = None;
        had
    }
}

// =============================================================================
// AUTH PROVIDER
// =============================================================================

/// What the guard needs to know about the provider path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub configured: bool,
    pub initialized: bool,
    pub authenticated: bool,
}

/// Result of the startup [`AuthProvider::restore`] flow.
#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    /// Stored credentials were still (or became) viable; profile confirmed.
    Restored(Employee),
    /// No usable session; local state is clear.
    SignedOut,
}

#[derive(Default)]
struct ProviderStatus {
    initialized: bool,
    authenticated: bool,
}

struct ProviderInner {
    http: reqwest::Client,
    base_url: String,
    idp: Option<Arc<dyn IdentityProvider>>,
    init_timeout: Duration,
    token_min_validity: Duration,
    session: SessionHandle,
    store: Arc<dyn SessionStore>,
    notices: NoticeSender,
    init: OnceCell<()>,
    status: RwLock<ProviderStatus>,
    idp_tokens: RwLock<Option<IdpTokens>>,
    renewal: Mutex<()>,
    login_in_progress: AtomicBool,
}

/// Owner of `{configured, initialized, authenticated}` and the session
/// lifecycle operations. Cheap to clone.
#[derive(Clone)]
pub struct AuthProvider {
    inner: Arc<ProviderInner>,
}

impl AuthProvider {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        http: reqwest::Client,
        session: SessionHandle,
        store: Arc<dyn SessionStore>,
        idp: Option<Arc<dyn IdentityProvider>>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                http,
                base_url: config.base_url.clone(),
                idp,
                init_timeout: config.init_timeout,
                token_min_validity: config.token_min_validity,
                session,
                store,
                notices,
                init: OnceCell::new(),
                status: RwLock::new(ProviderStatus::default()),
                idp_tokens: RwLock::new(None),
                renewal: Mutex::new(()),
                login_in_progress: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn configured(&self) -> bool {
        self.inner.idp.is_some()
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        let status = self.inner.status.read().await;
        AuthSnapshot {
            configured: self.inner.idp.is_some(),
            initialized: status.initialized,
            authenticated: status.authenticated,
        }
    }

    /// Run identity-provider initialization at most once, bounded by the
    /// configured timeout, and return the resulting snapshot. Concurrent and
    /// repeated calls all wait on the same underlying attempt — the provider
    /// SDK must never see a second `init`.
    pub async fn ensure_initialized(&self) -> AuthSnapshot {
        self.inner.init.get_or_init(|| self.run_init()).await;
        self.snapshot().await
    }

    async fn run_init(&self) {
        let Some(idp) = self.inner.idp.clone() else {
            self.inner.status.write().await.initialized = true;
            return;
        };

        let prior_refresh = self.inner.store.load().await.and_then(|s| s.refresh_token);
        let attempt = tokio::time::timeout(self.inner.init_timeout, idp.init(prior_refresh.as_deref())).await;

        let mut authenticated = false;
        match attempt {
            Ok(Ok(Some(tokens))) => {
                authenticated = true;
                self.adopt_idp_tokens(&tokens).await;
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "identity provider initialization failed");
                let _ = self.inner.notices.send(Notice::Error(SSO_INIT_FAILED_MESSAGE.to_owned()));
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.inner.init_timeout, "identity provider initialization timed out");
                let _ = self.inner.notices.send(Notice::Error(SSO_INIT_FAILED_MESSAGE.to_owned()));
            }
        }

        let mut status = self.inner.status.write().await;
        status.initialized = true;
        status.authenticated = authenticated;
        if authenticated {
            self.inner.login_in_progress.store(false, Ordering::SeqCst);
        }
    }

    /// Start the redirect-based provider login. No-op without a configured
    /// provider (password login posts to the login endpoint directly) and
    /// while a previous login attempt is still in progress.
    pub fn login(&self) -> Option<String> {
        let idp = self.inner.idp.as_ref()?;
        if self.inner.login_in_progress.swap(true, Ordering::SeqCst) {
            return None;
        }
        let url = idp.authorize_url();
        let _ = self.inner.notices.send(Notice::RedirectToProvider(url.clone()));
        Some(url)
    }

    /// Re-arm [`Self::login`] after an abandoned redirect.
    pub fn login_settled(&self) {
        self.inner.login_in_progress.store(false, Ordering::SeqCst);
    }

    /// Sign out. Local state is cleared first so the UI flips immediately;
    /// the server / identity provider is then notified best-effort, and any
    /// network failure there is logged and swallowed.
    pub async fn logout(&self) {
        let token = self.inner.session.token().await;
        let provider_session = self.inner.idp_tokens.write().await.take();

        let was_signed_in = self.inner.session.clear().await;
        self.inner.status.write().await.authenticated = false;
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "failed to clear session storage");
        }
        self.inner.login_in_progress.store(false, Ordering::SeqCst);

        if let Some(tokens) = provider_session {
            if let Some(idp) = self.inner.idp.as_ref() {
                if let Err(e) = idp.end_session(tokens.refresh_token.as_deref()).await {
                    tracing::warn!(error = %e, "identity provider logout failed");
                }
            }
        } else if was_signed_in {
            if let Err(e) = self.backend_logout(token).await {
                tracing::debug!(error = %e, "backend logout failed");
            }
        }
    }

    async fn backend_logout(&self, token: Option<String>) -> Result<(), reqwest::Error> {
        let url = format!("{}/auth/logout", self.inner.base_url);
        let mut req = self.inner.http.post(&url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await?;
        Ok(())
    }

    // =========================================================================
    // STARTUP RESTORE
    // =========================================================================

    /// Revalidate stored credentials against the backend: still-active token
    /// is confirmed with a profile fetch, an active refresh credential earns
    /// one silent refresh first, and anything else clears the session.
    pub async fn restore(&self, api: &ApiClient) -> RestoreOutcome {
        let Some(stored) = self.inner.store.load().await else {
            return RestoreOutcome::SignedOut;
        };
        self.inner.session.hydrate(&stored).await;

        match api.validate_token().await {
            Ok(v) if v.token_active => self.confirm_profile(api).await,
            Ok(v) if v.refresh_token_active => {
                if api.refresh_session().await.is_ok() {
                    self.confirm_profile(api).await
                } else {
                    self.expire(api).await
                }
            }
            Ok(_) => self.expire(api).await,
            Err(e) => {
                tracing::warn!(error = %e, "stored session validation failed");
                self.expire(api).await
            }
        }
    }

    async fn confirm_profile(&self, api: &ApiClient) -> RestoreOutcome {
        match api.me().await {
            Ok(profile) if profile.has_identity() => {
                self.inner.session.adopt_profile(profile.clone()).await;
                RestoreOutcome::Restored(profile)
            }
            Ok(_) | Err(_) => self.expire(api).await,
        }
    }

    async fn expire(&self, api: &ApiClient) -> RestoreOutcome {
        api.terminal_auth().await;
        RestoreOutcome::SignedOut
    }

    // =========================================================================
    // PROVIDER TOKEN RENEWAL
    // =========================================================================

    fn margin(&self) -> time::Duration {
        time::Duration::try_from(self.inner.token_min_validity).unwrap_or(time::Duration::seconds(30))
    }

    async fn adopt_idp_tokens(&self, tokens: &IdpTokens) {
        self.inner.session.set_token(tokens.access_token.clone()).await;
        let snapshot = self.inner.session.snapshot().await;
        let stored = StoredSession {
            token: tokens.access_token.clone(),
            user_id: snapshot.user_id.unwrap_or_default(),
            roles: snapshot.roles,
            refresh_token: tokens.refresh_token.clone(),
        };
        if let Err(e) = self.inner.store.save(&stored).await {
            tracing::warn!(error = %e, "failed to persist session");
        }
        *self.inner.idp_tokens.write().await = Some(tokens.clone());
    }

    /// A provider token that is valid for at least the configured margin, or
    /// `None` when the provider path holds no session.
    async fn fresh_provider_token(&self) -> Option<String> {
        let idp = self.inner.idp.as_ref()?;

        {
            let tokens = self.inner.idp_tokens.read().await;
            let current = tokens.as_ref()?;
            if !current.expires_within(self.margin()) {
                return Some(current.access_token.clone());
            }
        }

        // One renewal at a time; whoever loses the race re-checks expiry.
        let _gate = self.inner.renewal.lock().await;
        let current = self.inner.idp_tokens.read().await.clone()?;
        if !current.expires_within(self.margin()) {
            return Some(current.access_token);
        }
        let Some(refresh_token) = current.refresh_token else {
            self.renewal_failed().await;
            return None;
        };
        match idp.refresh(&refresh_token).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                self.adopt_idp_tokens(&fresh).await;
                Some(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "provider token renewal failed");
                self.renewal_failed().await;
                None
            }
        }
    }

    async fn renewal_failed(&self) {
        *self.inner.idp_tokens.write().await = None;
        self.inner.status.write().await.authenticated = false;
        self.inner.session.clear().await;
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "failed to clear session storage");
        }
    }
}

#[async_trait::async_trait]
impl TokenSource for AuthProvider {
    async fn bearer_token(&self) -> Option<String> {
        if self.inner.idp.is_some() {
            if let Some(token) = self.fresh_provider_token().await {
                return Some(token);
            }
        }
        self.inner.session.token().await
    }

    async fn invalidate(&self) {
        *self.inner.idp_tokens.write().await = None;
        self.inner.status.write().await.authenticated = false;
    }
}
