//! Inline previews of binary attachments.
//!
//! A fetched file is held behind a `blob:` object URL until the preview is
//! closed. Releasing the URL is explicit; `PreviewHandle` does it on close or
//! drop so a dismissed dialog never leaks the bytes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

use crate::api::{ApiClient, Binary};
use crate::errors::{SyncError, SyncResult};
use crate::notify::Notifier;

/// Registry of live object URLs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    blobs: Arc<Mutex<HashMap<String, Binary>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Binary>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `binary` and return its `blob:` URL.
    pub fn create(&self, binary: Binary) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.blobs().insert(url.clone(), binary);
        url
    }

    /// Bytes behind `url`, while it is live.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.blobs().get(url).map(|binary| binary.bytes.clone())
    }

    /// Release `url`. Returns whether it was live.
    pub fn revoke(&self, url: &str) -> bool {
        self.blobs().remove(url).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.blobs().len()
    }
}

/// An open preview. Revokes its object URL when closed or dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    content_type: String,
    registry: ObjectUrlRegistry,
    revoked: bool,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.revoked {
            self.registry.revoke(&self.url);
            self.revoked = true;
            tracing::debug!("Revoked preview URL {}", self.url);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens previews of stored files with an explicit deadline.
#[derive(Debug, Clone)]
pub struct Previewer {
    api: ApiClient,
    registry: ObjectUrlRegistry,
    notifier: Notifier,
    timeout: Duration,
}

impl Previewer {
    pub fn new(api: ApiClient, notifier: Notifier, timeout: Duration) -> Self {
        Self {
            api,
            registry: ObjectUrlRegistry::new(),
            notifier,
            timeout,
        }
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// Direct download link, the fallback when a preview times out.
    pub fn download_url(&self, path: &str) -> String {
        self.api.resolve(path)
    }

    /// Fetch `path` and hold it behind an object URL.
    ///
    /// A timeout surfaces as `SyncError::Timeout`, whose message points the
    /// user at downloading instead.
    pub async fn open(&self, path: &str) -> SyncResult<PreviewHandle> {
        match self.api.fetch_binary(path, self.timeout).await {
            Ok(binary) => {
                let content_type = binary.content_type.clone();
                let url = self.registry.create(binary);
                tracing::debug!("Opened preview of {} as {}", path, url);
                Ok(PreviewHandle {
                    url,
                    content_type,
                    registry: self.registry.clone(),
                    revoked: false,
                })
            }
            Err(e) => {
                self.notifier.failure("preview", &e);
                Err(e)
            }
        }
    }
}
