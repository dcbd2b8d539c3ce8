//! Keycloak-shaped OIDC provider client.
//!
//! Endpoint layout: `{issuer}/realms/{realm}/protocol/openid-connect/...`.
//! Silent sign-in and renewal both ride the refresh-token grant; the
//! interactive flow is a plain redirect to the authorization endpoint.

#[cfg(test)]
#[path = "oidc_test.rs"]
mod tests;

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::config::IdpConfig;
use crate::error::IdpError;

use super::{IdentityProvider, IdpTokens};

pub struct OidcProvider {
    http: reqwest::Client,
    config: IdpConfig,
}

impl OidcProvider {
    #[must_use]
    pub fn new(http: reqwest::Client, config: IdpConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{name}",
            self.config.issuer_url.trim_end_matches('/'),
            self.config.realm
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
}

impl TokenResponse {
    fn into_tokens(self) -> IdpTokens {
        let lifetime = time::Duration::seconds(i64::try_from(self.expires_in).unwrap_or(i64::MAX));
        IdpTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: OffsetDateTime::now_utc() + lifetime,
        }
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn init(&self, prior_refresh_token: Option<&str>) -> Result<Option<IdpTokens>, IdpError> {
        let Some(refresh_token) = prior_refresh_token else {
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(tokens) => Ok(Some(tokens)),
            // An expired or revoked provider session is a clean signed-out.
            Err(IdpError::Rejected { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&response_type=code&scope=openid",
            self.endpoint("auth"),
            self.config.client_id
        )
    }

    async fn refresh(&self, refresh_token: &str) -> Result<IdpTokens, IdpError> {
        let resp = self
            .http
            .post(self.endpoint("token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IdpError::Rejected { status });
        }
        let body: TokenResponse = resp.json().await.map_err(|e| IdpError::Decode(e.to_string()))?;
        Ok(body.into_tokens())
    }

    async fn end_session(&self, refresh_token: Option<&str>) -> Result<(), IdpError> {
        let mut form = vec![("client_id", self.config.client_id.as_str())];
        if let Some(refresh_token) = refresh_token {
            form.push(("refresh_token", refresh_token));
        }
        let resp = self.http.post(self.endpoint("logout")).form(&form).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(IdpError::Rejected { status })
        }
    }
}
