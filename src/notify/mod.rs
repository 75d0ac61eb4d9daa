//! User-visible notifications.
//!
//! Operations never swallow failures: each one ends in a notification that a
//! front end renders as an auto-dismissing banner.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::errors::SyncError;

/// Buffered notifications per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient banner message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    #[serde(with = "millis")]
    pub auto_hide: Duration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the banner should have been dismissed by `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.auto_hide) {
            Ok(ttl) => now >= self.created_at + ttl,
            Err(_) => false,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Fan-out of notifications to whoever renders them.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    auto_hide: Duration,
}

impl Notifier {
    pub fn new(auto_hide: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, auto_hide }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn notify(&self, severity: Severity, message: impl Into<String>) {
        let notification = Notification {
            severity,
            message: message.into(),
            auto_hide: self.auto_hide,
            created_at: Utc::now(),
        };
        // No renderer attached is fine
        let _ = self.sender.send(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Severity::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Severity::Info, message);
    }

    /// Log `err` and surface it. Cancellation is not user-visible.
    pub fn failure(&self, context: &str, err: &SyncError) {
        if err.is_cancelled() {
            tracing::debug!("{} cancelled", context);
            return;
        }
        match err {
            SyncError::Validation(_) => tracing::warn!("{} rejected: {}", context, err),
            _ => tracing::error!("{} failed: {}", context, err),
        }
        self.notify(err.severity(), err.user_message());
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(4000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FieldError;

    #[tokio::test]
    async fn test_failure_notification() {
        let notifier = Notifier::new(Duration::from_millis(3500));
        let mut rx = notifier.subscribe();

        notifier.failure("create job", &SyncError::Transport("refused".into()));
        let n = rx.recv().await.unwrap();
        assert_eq!(n.severity, Severity::Error);
        assert_eq!(n.message, "Cannot connect to server.");
        assert_eq!(n.auto_hide, Duration::from_millis(3500));

        notifier.failure(
            "create story",
            &SyncError::Validation(vec![FieldError::new("title", "Title is required")]),
        );
        let n = rx.recv().await.unwrap();
        assert_eq!(n.severity, Severity::Warning);
        assert_eq!(n.message, "Title is required");
    }

    #[tokio::test]
    async fn test_cancelled_is_silent() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.failure("load", &SyncError::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_expiry() {
        let notifier = Notifier::new(Duration::from_secs(4));
        let mut rx = notifier.subscribe();
        notifier.success("Saved");
        let n = rx.try_recv().unwrap();
        assert!(!n.is_expired(n.created_at));
        assert!(n.is_expired(n.created_at + chrono::Duration::seconds(4)));
    }
}
