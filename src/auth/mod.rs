//! Bearer-token authentication for outgoing requests.
//!
//! The token lives in persistent storage and is read on every request, so a
//! login in another session takes effect without restarting the client.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use reqwest::RequestBuilder;

/// Source of the admin bearer token.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Current token, if one is stored.
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Token kept in a file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read token file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn store(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Token kept in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, token: &str) -> std::io::Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        Ok(())
    }
}

/// Authentication injected into the API client.
#[derive(Debug, Clone)]
pub struct AuthContext {
    store: Arc<dyn TokenStore>,
}

impl AuthContext {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// No token at all; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::new(Arc::new(MemoryTokenStore::default()))
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryTokenStore::with_token(token)))
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Attach the bearer token, or send the request as is when there is none.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.load() {
            Some(token) => request.bearer_auth(token),
            None => {
                tracing::debug!("No admin token stored; sending unauthenticated request");
                request
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        assert!(store.load().is_none());
        store.store("abc123\n").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc123"));
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_blank_token_file_is_no_token() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.store("   ").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_memory_store() {
        let auth = AuthContext::with_token("t0");
        assert_eq!(auth.store().load().as_deref(), Some("t0"));
        auth.store().clear().unwrap();
        assert!(auth.store().load().is_none());
    }

    #[test]
    fn test_apply_sets_bearer() {
        let client = reqwest::Client::new();
        let auth = AuthContext::with_token("secret");
        let request = auth
            .apply(client.get("http://localhost/api/jobs"))
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer secret"
        );

        let request = AuthContext::anonymous()
            .apply(client.get("http://localhost/api/jobs"))
            .build()
            .unwrap();
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }
}
