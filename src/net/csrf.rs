//! CSRF token tracking for cookie-mode deployments.
//!
//! The backend hands out the token in a response header; we remember the last
//! one seen and attach it to subsequent unsafe requests under the configured
//! header name. Safe methods and requests made before any token was observed
//! go out untouched.

#[cfg(test)]
#[path = "csrf_test.rs"]
mod tests;

use std::sync::Mutex;

use reqwest::Method;
use reqwest::header::HeaderMap;

pub(crate) fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

pub(crate) struct CsrfState {
    header: String,
    token: Mutex<Option<String>>,
}

impl CsrfState {
    pub(crate) fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
            token: Mutex::new(None),
        }
    }

    /// Capture a token from response headers, if the server sent one.
    pub(crate) fn observe(&self, headers: &HeaderMap) {
        let Some(value) = headers.get(self.header.as_str()).and_then(|v| v.to_str().ok()) else {
            return;
        };
        if value.is_empty() {
            return;
        }
        let mut slot = self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(value.to_owned());
    }

    /// Header to attach for this method, or `None` for safe methods and when
    /// no token has been observed yet.
    pub(crate) fn apply(&self, method: &Method) -> Option<(String, String)> {
        if is_safe_method(method) {
            return None;
        }
        let slot = self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        slot.as_ref().map(|token| (self.header.clone(), token.clone()))
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
