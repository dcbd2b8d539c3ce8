//! Outbound signals to the embedding UI.
//!
//! The session subsystem's only user-visible side effects are redirect
//! instructions and error notifications; both travel over this channel. The
//! UI owns the receiver and maps notices onto its own toast/navigation
//! machinery.

use tokio::sync::mpsc;

/// One outbound signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Show an error notification. At most one is emitted per failed request.
    Error(String),
    /// The session ended without the user asking for it (refresh failure or
    /// an unrecoverable 401). Emitted once per terminal-auth event, however
    /// many requests were queued behind it.
    SessionExpired,
    /// Navigate to the login view, replacing history so "back" cannot loop
    /// into the protected view.
    RedirectToLogin,
    /// Navigate to the identity provider's authorization page.
    RedirectToProvider(String),
}

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Build the notice channel; the receiver goes to the UI.
#[must_use]
pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}
