//! Durable session descriptor storage.
//!
//! A mirror of the last known credentials, used only to restore them across
//! process restarts. Never the source of truth for "am I authenticated" —
//! that lives with the auth provider. Malformed or unreadable content is
//! treated as absent, never as an error.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The persisted descriptor: one JSON document under one well-known path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Durable holder of the last known session descriptor.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the descriptor. Absent or malformed content yields `None`.
    async fn load(&self) -> Option<StoredSession>;
    /// Persist the descriptor.
    async fn save(&self, session: &StoredSession) -> Result<(), StoreError>;
    /// Remove the descriptor. Clearing an absent descriptor is fine.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// File-backed store: the production implementation.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self) -> Option<StoredSession> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file unreadable, treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file malformed, treating as absent");
                None
            }
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string(session)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral embeddings.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<StoredSession>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a descriptor.
    #[must_use]
    pub fn seeded(session: StoredSession) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Option<StoredSession> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}
