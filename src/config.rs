//! Environment-driven client configuration.
//!
//! DESIGN
//! ======
//! One validated struct built once at startup. Identity-provider settings are
//! all-or-nothing: `IdpConfig::from_env` returns `None` when any variable is
//! missing, which disables the SSO path entirely instead of leaving partial
//! state behind. Missing optional values fall back to defaults; they are never
//! errors.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8082/api";
const DEFAULT_SESSION_FILE: &str = ".hrdesk-session.json";
const DEFAULT_CSRF_HEADER: &str = "x-csrf-token";

const DEFAULT_INIT_TIMEOUT_MS: u64 = 8000;
const DEFAULT_TOKEN_MIN_VALIDITY_SECS: u64 = 30;
const DEFAULT_PROFILE_HOLDOFF_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Identity-provider (SSO) settings.
///
/// Present only when the deployment runs behind an external identity provider;
/// password login against the backend needs none of this.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Issuer base URL, e.g. `https://sso.example.com`.
    pub issuer_url: String,
    /// Realm / tenant name.
    pub realm: String,
    /// Public client identifier registered with the provider.
    pub client_id: String,
}

impl IdpConfig {
    /// Load from `HRDESK_IDP_URL`, `HRDESK_IDP_REALM`, `HRDESK_IDP_CLIENT_ID`.
    /// Returns `None` if any are missing or blank (SSO will be disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let issuer_url = env_trimmed("HRDESK_IDP_URL")?;
        let realm = env_trimmed("HRDESK_IDP_REALM")?;
        let client_id = env_trimmed("HRDESK_IDP_CLIENT_ID")?;
        Some(Self { issuer_url, realm, client_id })
    }
}

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, no trailing slash.
    pub base_url: String,
    /// Cookie transport mode: the session credential rides in a cookie managed
    /// by the HTTP client instead of an `Authorization` header.
    pub cookie_auth: bool,
    /// Path of the durable session descriptor file.
    pub session_file: PathBuf,
    /// Header name used for CSRF tokens in cookie mode.
    pub csrf_header: String,
    /// Identity-provider settings; `None` disables the SSO path.
    pub idp: Option<IdpConfig>,
    /// Upper bound on identity-provider initialization.
    pub init_timeout: Duration,
    /// Minimum remaining validity before a provider token is proactively renewed.
    pub token_min_validity: Duration,
    /// Hold-off window after a failed who-am-i before the guard retries.
    pub profile_holdoff: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the backend URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            cookie_auth: false,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            csrf_header: DEFAULT_CSRF_HEADER.to_owned(),
            idp: None,
            init_timeout: Duration::from_millis(DEFAULT_INIT_TIMEOUT_MS),
            token_min_validity: Duration::from_secs(DEFAULT_TOKEN_MIN_VALIDITY_SECS),
            profile_holdoff: Duration::from_secs(DEFAULT_PROFILE_HOLDOFF_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load from the environment (and a `.env` file when present).
    ///
    /// `HRDESK_API_BASE_URL`, `HRDESK_COOKIE_AUTH`, `HRDESK_SESSION_FILE`,
    /// `HRDESK_CSRF_HEADER`, `HRDESK_IDP_INIT_TIMEOUT_MS` plus the
    /// [`IdpConfig`] variables.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env_trimmed("HRDESK_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(base_url);

        config.cookie_auth = env_bool("HRDESK_COOKIE_AUTH").unwrap_or(false);
        if let Some(path) = env_trimmed("HRDESK_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }
        if let Some(header) = env_trimmed("HRDESK_CSRF_HEADER") {
            config.csrf_header = header.to_ascii_lowercase();
        }
        config.idp = IdpConfig::from_env();
        config.init_timeout = Duration::from_millis(env_parse("HRDESK_IDP_INIT_TIMEOUT_MS", DEFAULT_INIT_TIMEOUT_MS));
        config.token_min_validity =
            Duration::from_secs(env_parse("HRDESK_TOKEN_MIN_VALIDITY_SECS", DEFAULT_TOKEN_MIN_VALIDITY_SECS));
        config.profile_holdoff =
            Duration::from_secs(env_parse("HRDESK_PROFILE_HOLDOFF_SECS", DEFAULT_PROFILE_HOLDOFF_SECS));
        config.request_timeout =
            Duration::from_secs(env_parse("HRDESK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        config
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
