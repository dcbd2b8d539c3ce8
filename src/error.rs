//! Error taxonomy for the API layer.
//!
//! The interception layer in [`crate::net::api`] is the single place that
//! classifies failures and emits user-facing notices; feature code only
//! branches on "succeeded" vs "must redirect" vs "left a server message".

use reqwest::StatusCode;

/// Classified outcome of a failed API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400/404/other client-input rejections. Carries the server-supplied
    /// message when one could be decoded, a generic fallback otherwise.
    /// Never clears the session.
    #[error("{message}")]
    BadRequest { message: String },

    /// Terminal 401: refresh failed, was unavailable, or the replayed request
    /// was rejected again. The session has been cleared by the time this is
    /// returned.
    #[error("authentication required")]
    AuthRequired,

    /// 403: the caller is authenticated but lacks privilege. The session is
    /// preserved.
    #[error("{message}")]
    Forbidden { message: String },

    /// 5xx: transient server failure; the caller may retry manually.
    #[error("server error ({status})")]
    Server { status: StatusCode },

    /// No response at all (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this failure should send the user back to the login view.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

/// Errors from the durable session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session storage i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from the identity-provider client.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    #[error("identity provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider rejected the request ({status})")]
    Rejected { status: StatusCode },
    #[error("identity provider response malformed: {0}")]
    Decode(String),
}
