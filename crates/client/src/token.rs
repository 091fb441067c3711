//! Bearer-token storage.
//!
//! The token lives in memory and, when a path is configured, is mirrored
//! to a file so a restarted client stays signed in.

use std::path::PathBuf;

use tokio::sync::RwLock;

pub struct TokenStore {
    token: RwLock<Option<String>>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// A store that forgets the token when the process exits.
    pub fn in_memory() -> Self {
        Self {
            token: RwLock::new(None),
            path: None,
        }
    }

    /// A store backed by `path`, pre-loaded with its contents if the file
    /// exists and is non-empty.
    pub async fn persistent(path: PathBuf) -> std::io::Result<Self> {
        let token = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        tracing::debug!(path = %path.display(), loaded = token.is_some(), "Token store opened");
        Ok(Self {
            token: RwLock::new(token),
            path: Some(path),
        })
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_present(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Replace the token. A failed file write is logged; the in-memory
    /// token is updated regardless.
    pub async fn set(&self, token: String) {
        if let Some(path) = &self.path {
            if let Err(e) = tokio::fs::write(path, &token).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist token");
            }
        }
        *self.token.write().await = Some(token);
    }

    pub async fn clear(&self) {
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove token file")
                }
            }
        }
        *self.token.write().await = None;
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
