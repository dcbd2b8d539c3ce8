//! Identity-provider seam.
//!
//! The auth provider consumes this trait; production wires in the
//! Keycloak-shaped [`OidcProvider`], tests substitute their own.

pub mod oidc;

pub use oidc::OidcProvider;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::IdpError;

/// Tokens issued by the provider, with absolute expiry.
#[derive(Debug, Clone)]
pub struct IdpTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: OffsetDateTime,
}

impl IdpTokens {
    /// Whether the access token runs out within `margin` from now.
    #[must_use]
    pub fn expires_within(&self, margin: time::Duration) -> bool {
        self.expires_at - OffsetDateTime::now_utc() <= margin
    }
}

/// An external system that authenticates the user and issues credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Silent sign-in check at startup. `Ok(Some)` when a provider session
    /// already exists (typically revived from `prior_refresh_token`);
    /// `Ok(None)` is a clean "not signed in", not an error.
    async fn init(&self, prior_refresh_token: Option<&str>) -> Result<Option<IdpTokens>, IdpError>;

    /// Where to send the browser for the interactive login flow.
    fn authorize_url(&self) -> String;

    /// Exchange a refresh credential for fresh tokens.
    async fn refresh(&self, refresh_token: &str) -> Result<IdpTokens, IdpError>;

    /// Terminate the provider-side session.
    async fn end_session(&self, refresh_token: Option<&str>) -> Result<(), IdpError>;
}
