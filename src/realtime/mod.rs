//! Realtime invalidation signals.
//!
//! The push server announces that a collection changed; the client reacts by
//! refetching. Payloads carried by events are never merged into local state.

mod http;
mod hub;

pub use http::*;
pub use hub::*;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::DropGuard;

use crate::errors::SyncResult;
use crate::models::Resource;

/// What happened to the collection, when the server says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl ChangeAction {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" | "create" => Some(ChangeAction::Created),
            "updated" | "update" => Some(ChangeAction::Updated),
            "deleted" | "delete" => Some(ChangeAction::Deleted),
            _ => None,
        }
    }
}

/// A named event pushed by the realtime server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RealtimeEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// "The local copy of `collection` may be stale."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationSignal {
    /// Event prefix of the collection, e.g. `jobs`
    pub collection: String,
    pub action: Option<ChangeAction>,
}

impl InvalidationSignal {
    pub fn new(collection: impl Into<String>, action: Option<ChangeAction>) -> Self {
        Self {
            collection: collection.into(),
            action,
        }
    }

    /// Interpret `<prefix>-created|updated|deleted|admin-updated`.
    ///
    /// Returns `None` for events that are not collection changes.
    pub fn from_event(event: &RealtimeEvent) -> Option<Self> {
        if let Some(collection) = event.event.strip_suffix("-admin-updated") {
            if collection.is_empty() {
                return None;
            }
            let action = event
                .data
                .get("action")
                .and_then(Value::as_str)
                .and_then(ChangeAction::parse);
            return Some(Self::new(collection, action));
        }

        let (collection, suffix) = event.event.rsplit_once('-')?;
        let action = ChangeAction::parse(suffix)?;
        if collection.is_empty() {
            return None;
        }
        Some(Self::new(collection, Some(action)))
    }

    pub fn concerns<T: Resource>(&self) -> bool {
        self.collection == T::EVENT_PREFIX
    }
}

/// Collection prefix of a `<prefix>-room` room name.
pub(crate) fn room_collection(room: &str) -> &str {
    room.strip_suffix("-room").unwrap_or(room)
}

/// A transport that can join rooms.
pub trait RealtimeChannel: Send + Sync {
    /// Join `room`. Leaving happens when the returned subscription is dropped.
    fn subscribe(&self, room: &str) -> SyncResult<Subscription>;
}

/// Stream of invalidation signals for one joined room.
pub struct Subscription {
    room: String,
    stream: Pin<Box<dyn Stream<Item = InvalidationSignal> + Send>>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    pub fn new(
        room: impl Into<String>,
        stream: impl Stream<Item = InvalidationSignal> + Send + 'static,
        guard: Option<DropGuard>,
    ) -> Self {
        Self {
            room: room.into(),
            stream: Box::pin(stream),
            _guard: guard,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("room", &self.room).finish()
    }
}

impl Stream for Subscription {
    type Item = InvalidationSignal;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!("Leaving realtime room {}", self.room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobApplication, JobPosting};
    use serde_json::json;

    #[test]
    fn test_named_events() {
        let signal =
            InvalidationSignal::from_event(&RealtimeEvent::new("jobs-created", Value::Null)).unwrap();
        assert_eq!(signal, InvalidationSignal::new("jobs", Some(ChangeAction::Created)));
        assert!(signal.concerns::<JobPosting>());
        assert!(!signal.concerns::<JobApplication>());

        let signal = InvalidationSignal::from_event(&RealtimeEvent::new(
            "climate-features-deleted",
            json!({ "id": "c1" }),
        ))
        .unwrap();
        assert_eq!(signal.collection, "climate-features");
        assert_eq!(signal.action, Some(ChangeAction::Deleted));
    }

    #[test]
    fn test_admin_updated_reads_action() {
        let event = RealtimeEvent::new(
            "stories-admin-updated",
            json!({ "success": true, "data": [], "action": "update" }),
        );
        let signal = InvalidationSignal::from_event(&event).unwrap();
        assert_eq!(signal.collection, "stories");
        assert_eq!(signal.action, Some(ChangeAction::Updated));

        let event = RealtimeEvent::new("stories-admin-updated", json!({ "data": [] }));
        assert_eq!(InvalidationSignal::from_event(&event).unwrap().action, None);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        for name in ["connect", "jobs-viewed", "-created", "-admin-updated", "welcome-message"] {
            assert!(
                InvalidationSignal::from_event(&RealtimeEvent::new(name, Value::Null)).is_none(),
                "{name}"
            );
        }
    }

    #[test]
    fn test_room_collection() {
        assert_eq!(room_collection("jobs-room"), "jobs");
        assert_eq!(room_collection("lobby"), "lobby");
    }
}
