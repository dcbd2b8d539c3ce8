//! HTTP client with request/response interception.
//!
//! ARCHITECTURE
//! ============
//! All feature traffic goes through [`ApiClient::execute`]: the outgoing side
//! attaches the credential (bearer header or cookie-managed) and the CSRF
//! token, the incoming side classifies failures into [`ApiError`] and emits at
//! most one [`Notice`] per failed request. A 401 on a non-anonymous request
//! enters the single-flight recovery path in [`super::refresh`].
//!
//! Session-machinery calls (refresh, validate) use the bare dispatch path that
//! skips classification entirely — the refresh call must never be subject to
//! its own 401-triggered refresh, or it recurses.

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::notice::{Notice, NoticeSender};
use crate::session::provider::SessionHandle;
use crate::session::store::{SessionStore, StoredSession};

use super::csrf::CsrfState;
use super::refresh::{Replay, RefreshCoordinator};
use super::types::{Credentials, Employee, ErrorEnvelope, SessionData, TokenValidity};

pub(crate) const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub(crate) const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub(crate) const FORBIDDEN_MESSAGE: &str = "You are not authorized to perform this action.";
pub(crate) const GENERIC_ERROR_MESSAGE: &str = "An error occurred.";
pub(crate) const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

/// Supplier of the outgoing bearer credential.
///
/// The auth provider implements this; behind an identity provider it renews
/// the token before handing it out when expiry is near.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, renewed if necessary. `None` when signed out.
    async fn bearer_token(&self) -> Option<String>;
    /// Terminal auth: drop any provider-side credential state.
    async fn invalidate(&self);
}

/// Everything needed to issue (and re-issue) one request.
#[derive(Debug, Clone)]
pub(crate) struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Anonymous endpoints (login, password reset) skip credential attachment
    /// and never trigger a refresh.
    pub anonymous: bool,
}

impl RequestSpec {
    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), body: None, anonymous: false }
    }

    pub(crate) fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self { method: Method::POST, path: path.into(), body, anonymous: false }
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self { method: Method::DELETE, path: path.into(), body: None, anonymous: false }
    }

    pub(crate) fn into_anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Build the shared HTTP client. Shared so the provider's best-effort calls
/// ride the same cookie jar in cookie mode.
#[must_use]
pub fn build_http_client(config: &ClientConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
    if config.cookie_auth {
        builder = builder.cookie_store(true);
    }
    builder.build().unwrap_or_default()
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    cookie_auth: bool,
    csrf: CsrfState,
    session: SessionHandle,
    store: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenSource>,
    refresh: RefreshCoordinator,
    notices: NoticeSender,
}

/// The intercepted HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        http: reqwest::Client,
        session: SessionHandle,
        store: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenSource>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url.clone(),
                cookie_auth: config.cookie_auth,
                csrf: CsrfState::new(config.csrf_header.clone()),
                session,
                store,
                tokens,
                refresh: RefreshCoordinator::new(),
                notices,
            }),
        }
    }

    // =========================================================================
    // TYPED ENDPOINTS
    // =========================================================================

    /// `POST /auth/login` — password login. Establishes the session on success.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionData, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
        let spec = RequestSpec::post("/auth/login", Some(body)).into_anonymous();
        let resp = self.execute(spec).await?;
        let data: SessionData = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        self.adopt_session(&data).await;
        Ok(data)
    }

    /// `GET /employee/me` — who am I.
    pub async fn me(&self) -> Result<Employee, ApiError> {
        self.get("/employee/me").await
    }

    // =========================================================================
    // GENERIC PASSTHROUGHS
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.execute(RequestSpec::get(path)).await?;
        resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let resp = self.execute(RequestSpec::post(path, Some(body))).await?;
        resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(RequestSpec::delete(path)).await.map(|_| ())
    }

    // =========================================================================
    // INTERCEPTION PIPELINE
    // =========================================================================

    pub(crate) async fn execute(&self, spec: RequestSpec) -> Result<reqwest::Response, ApiError> {
        match self.dispatch(&spec).await {
            Err(e) => {
                self.notify(Notice::Error(NETWORK_ERROR_MESSAGE.to_owned()));
                Err(ApiError::Network(e))
            }
            Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED && !spec.anonymous => self.recover(spec).await,
            Ok(resp) => self.finish(resp, spec.anonymous).await,
        }
    }

    /// Outgoing interception: credential + CSRF attachment, then send.
    async fn dispatch(&self, spec: &RequestSpec) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.inner.base_url, spec.path);
        let mut req = self.inner.http.request(spec.method.clone(), &url);
        if !spec.anonymous && !self.inner.cookie_auth {
            if let Some(token) = self.inner.tokens.bearer_token().await {
                req = req.bearer_auth(token);
            }
        }
        if self.inner.cookie_auth {
            if let Some((name, value)) = self.inner.csrf.apply(&spec.method) {
                req = req.header(name, value);
            }
        }
        if let Some(body) = &spec.body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        self.inner.csrf.observe(resp.headers());
        Ok(resp)
    }

    /// Incoming interception: classify a settled response and emit the single
    /// user-facing notice for it.
    ///
    /// The non-anonymous 401 arm is only reachable for replayed requests (the
    /// first 401 goes through [`Self::recover`]) and is terminal: retried
    /// exactly once means no second refresh.
    async fn finish(&self, resp: reqwest::Response, anonymous: bool) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            if anonymous {
                let message = server_message(resp)
                    .await
                    .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_owned());
                self.notify(Notice::Error(message));
                return Err(ApiError::AuthRequired);
            }
            self.terminal_auth().await;
            return Err(ApiError::AuthRequired);
        }
        if status == StatusCode::FORBIDDEN {
            self.notify(Notice::Error(FORBIDDEN_MESSAGE.to_owned()));
            return Err(ApiError::Forbidden { message: FORBIDDEN_MESSAGE.to_owned() });
        }
        if status.is_server_error() {
            self.notify(Notice::Error(SERVER_ERROR_MESSAGE.to_owned()));
            return Err(ApiError::Server { status });
        }
        let message = server_message(resp)
            .await
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned());
        self.notify(Notice::Error(message.clone()));
        Err(ApiError::BadRequest { message })
    }

    /// 401 recovery: park behind the single-flight refresh and classify the
    /// replay outcome.
    async fn recover(&self, spec: RequestSpec) -> Result<reqwest::Response, ApiError> {
        let (leads, outcome) = self.inner.refresh.enlist(spec).await;
        if leads {
            // Detached so a cancelled caller cannot strand the queue mid-refresh.
            let client = self.clone();
            tokio::spawn(async move { client.drive_refresh().await });
        }
        match outcome.await {
            Ok(Replay::Response(Ok(resp))) => self.finish(resp, false).await,
            Ok(Replay::Response(Err(e))) => {
                self.notify(Notice::Error(NETWORK_ERROR_MESSAGE.to_owned()));
                Err(ApiError::Network(e))
            }
            Ok(Replay::AuthFailed) | Err(_) => Err(ApiError::AuthRequired),
        }
    }

    /// Leader side of the refresh: one network call, then replay or reject the
    /// queue in arrival order.
    async fn drive_refresh(&self) {
        let outcome = self.refresh_session().await;
        let pending = self.inner.refresh.settle().await;
        match outcome {
            Ok(()) => {
                tracing::debug!(queued = pending.len(), "session refreshed, replaying queued requests");
                for request in pending {
                    let replay = self.dispatch(&request.spec).await;
                    let _ = request.done.send(Replay::Response(replay));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                self.terminal_auth().await;
                for request in pending {
                    let _ = request.done.send(Replay::AuthFailed);
                }
            }
        }
    }

    // =========================================================================
    // SESSION MACHINERY (bare dispatch, never intercepted)
    // =========================================================================

    /// `POST /auth/refresh` — the one coordinated refresh call.
    pub(crate) async fn refresh_session(&self) -> Result<(), ApiError> {
        let resp = self.bare(Method::POST, "/auth/refresh").await?;
        if !resp.status().is_success() {
            return Err(ApiError::AuthRequired);
        }
        // Rotated credentials may come back in the body; cookie deployments
        // may rotate server-side only.
        match resp.json::<SessionData>().await {
            Ok(data) => self.adopt_session(&data).await,
            Err(e) => tracing::debug!(error = %e, "refresh response carried no session body"),
        }
        Ok(())
    }

    /// `POST /auth/validate-token` — which stored credentials remain viable.
    pub(crate) async fn validate_token(&self) -> Result<TokenValidity, ApiError> {
        let resp = self.bare(Method::POST, "/auth/validate-token").await?;
        if !resp.status().is_success() {
            return Err(ApiError::AuthRequired);
        }
        resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn bare(&self, method: Method, path: &str) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.inner.base_url, path);
        let mut req = self.inner.http.request(method.clone(), &url);
        if !self.inner.cookie_auth {
            if let Some(token) = self.inner.session.token().await {
                req = req.bearer_auth(token);
            }
        } else if let Some((name, value)) = self.inner.csrf.apply(&method) {
            req = req.header(name, value);
        }
        let resp = req.send().await?;
        self.inner.csrf.observe(resp.headers());
        Ok(resp)
    }

    // =========================================================================
    // SESSION STATE TRANSITIONS
    // =========================================================================

    pub(crate) async fn adopt_session(&self, data: &SessionData) {
        self.inner.session.establish(data).await;
        if let Some(token) = &data.token {
            let stored = StoredSession {
                token: token.clone(),
                user_id: data.user_id.clone(),
                roles: data.roles.clone(),
                refresh_token: data.refresh_token.clone(),
            };
            if let Err(e) = self.inner.store.save(&stored).await {
                tracing::warn!(error = %e, "failed to persist session");
            }
        }
    }

    /// Unrecoverable 401 or failed refresh: clear everything, tell the UI once.
    pub(crate) async fn terminal_auth(&self) {
        let was_signed_in = self.inner.session.clear().await;
        self.inner.tokens.invalidate().await;
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "failed to clear session storage");
        }
        if was_signed_in {
            self.notify(Notice::SessionExpired);
            self.notify(Notice::RedirectToLogin);
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.inner.notices.send(notice);
    }
}

async fn server_message(resp: reqwest::Response) -> Option<String> {
    let body = resp.text().await.ok()?;
    extract_message(&body)
}

/// Pull the human-readable message out of a backend error payload.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    if let Some(detail) = envelope.error {
        return Some(detail.message);
    }
    envelope.message
}
