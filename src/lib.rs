//! Client-side session management for the hrdesk HR backend.
//!
//! The crate owns the authenticated-session lifecycle so the embedding UI
//! does not have to: durable credential storage, an HTTP client that attaches
//! credentials and classifies failures, single-flight refresh on 401 with
//! FIFO replay of everything queued behind it, a per-navigation session
//! guard, and an auth provider that wraps an optional external identity
//! provider (password login works with none configured).
//!
//! The UI consumes three things: [`SessionGuard::check`] per protected
//! navigation, [`ApiClient`] for REST calls, and the [`Notice`] channel for
//! redirect instructions and error toasts — the subsystem's only
//! user-visible side effects.

pub mod config;
pub mod error;
pub mod idp;
pub mod net;
pub mod notice;
pub mod session;

use std::sync::Arc;

pub use config::{ClientConfig, IdpConfig};
pub use error::{ApiError, IdpError, StoreError};
pub use idp::{IdentityProvider, IdpTokens, OidcProvider};
pub use net::api::{ApiClient, TokenSource, build_http_client};
pub use net::types::{Credentials, Employee, SessionData, TokenValidity};
pub use notice::{Notice, NoticeReceiver, NoticeSender};
pub use session::guard::{GuardDecision, SessionGuard};
pub use session::provider::{AuthProvider, AuthSnapshot, RestoreOutcome, Session, SessionHandle};
pub use session::store::{FileStore, MemoryStore, SessionStore, StoredSession};

/// The wired-together client: one of everything, sharing one session.
pub struct Hrdesk {
    pub api: ApiClient,
    pub auth: AuthProvider,
    pub guard: SessionGuard,
}

impl Hrdesk {
    /// Production wiring: file-backed store, OIDC provider when configured.
    #[must_use]
    pub fn new(config: ClientConfig) -> (Self, NoticeReceiver) {
        let http = build_http_client(&config);
        let store: Arc<dyn SessionStore> = Arc::new(FileStore::new(config.session_file.clone()));
        let idp = config
            .idp
            .clone()
            .map(|idp| Arc::new(OidcProvider::new(http.clone(), idp)) as Arc<dyn IdentityProvider>);
        Self::wire(config, http, store, idp)
    }

    /// Wiring with injected store and identity provider (tests, embeddings
    /// with their own storage).
    #[must_use]
    pub fn assemble(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        idp: Option<Arc<dyn IdentityProvider>>,
    ) -> (Self, NoticeReceiver) {
        let http = build_http_client(&config);
        Self::wire(config, http, store, idp)
    }

    fn wire(
        config: ClientConfig,
        http: reqwest::Client,
        store: Arc<dyn SessionStore>,
        idp: Option<Arc<dyn IdentityProvider>>,
    ) -> (Self, NoticeReceiver) {
        let (notices, notice_rx) = notice::channel();
        let session = SessionHandle::default();
        let auth = AuthProvider::new(&config, http.clone(), session.clone(), Arc::clone(&store), idp, notices.clone());
        let api = ApiClient::new(
            &config,
            http,
            session.clone(),
            store,
            Arc::new(auth.clone()),
            notices.clone(),
        );
        let guard = SessionGuard::new(&config, api.clone(), auth.clone(), session, notices);
        (Self { api, auth, guard }, notice_rx)
    }
}
