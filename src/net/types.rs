//! Wire types shared with the backend.
//!
//! The backend serializes in camelCase; everything here renames accordingly.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current-user profile returned by `GET /employee/me`.
///
/// Identifies the signed-in person and drives role-based UI branching. Not
/// authoritative for session validity: the guard tolerates a stale or missing
/// profile and gates on the authentication state instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub uuid: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Employee {
    /// A profile only counts when it carries a real identifier.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !self.uuid.is_nil()
    }
}

/// Password login form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Session descriptor returned by login and refresh.
///
/// `token` is present in both transport modes: in cookie deployments the
/// server additionally sets the session cookie and the client simply never
/// attaches the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub token: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Answer from `POST /auth/validate-token`: which stored credentials are
/// still viable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidity {
    pub token_active: bool,
    pub refresh_token_active: bool,
}

/// Error payload shape used by the backend. Both the enveloped form
/// `{"error": {"message": ...}}` and the flat `{"message": ...}` occur.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: Option<ErrorDetail>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
}
