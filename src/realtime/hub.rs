//! In-process realtime rooms.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::{future, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use super::{room_collection, InvalidationSignal, RealtimeChannel, RealtimeEvent, Subscription};
use crate::errors::SyncResult;

const ROOM_CAPACITY: usize = 128;

/// Rooms backed by broadcast channels, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    rooms: Arc<Mutex<HashMap<String, broadcast::Sender<RealtimeEvent>>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<RealtimeEvent>>> {
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes under the rooms lock; `prune` takes the same lock.
    fn join(&self, room: &str) -> broadcast::Receiver<RealtimeEvent> {
        self.rooms()
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Push an event to everyone in `room`. Returns how many received it.
    pub fn publish(&self, room: &str, event: RealtimeEvent) -> usize {
        tracing::debug!("Publishing {} to {}", event.event, room);
        let Some(sender) = self.rooms().get(room).cloned() else {
            return 0;
        };
        match sender.send(event) {
            Ok(received) => received,
            Err(_) => {
                self.prune(room);
                0
            }
        }
    }

    /// Number of live subscriptions to `room`.
    pub fn subscriber_count(&self, room: &str) -> usize {
        let count = self
            .rooms()
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0);
        if count == 0 {
            self.prune(room);
        }
        count
    }

    /// Forget `room` once nobody is listening.
    fn prune(&self, room: &str) {
        let mut rooms = self.rooms();
        if rooms.get(room).is_some_and(|sender| sender.receiver_count() == 0) {
            rooms.remove(room);
            tracing::debug!("Closed empty local room {}", room);
        }
    }
}

impl RealtimeChannel for LocalHub {
    fn subscribe(&self, room: &str) -> SyncResult<Subscription> {
        tracing::debug!("Joining local room {}", room);
        let collection = room_collection(room).to_string();
        let receiver = self.join(room);

        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            future::ready(match item {
                Ok(event) => InvalidationSignal::from_event(&event),
                // Missed events still mean the collection changed
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("Realtime subscriber lagged by {} events", skipped);
                    Some(InvalidationSignal::new(collection.clone(), None))
                }
            })
        });

        Ok(Subscription::new(room, stream, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeAction;
    use serde_json::Value;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = LocalHub::new();
        let mut sub = hub.subscribe("jobs-room").unwrap();
        assert_eq!(hub.subscriber_count("jobs-room"), 1);

        hub.publish("jobs-room", RealtimeEvent::new("jobs-updated", Value::Null));
        hub.publish("jobs-room", RealtimeEvent::new("connect", Value::Null));
        hub.publish("jobs-room", RealtimeEvent::new("jobs-deleted", Value::Null));

        let first = sub.next().await.unwrap();
        assert_eq!(first.action, Some(ChangeAction::Updated));
        let second = sub.next().await.unwrap();
        assert_eq!(second.action, Some(ChangeAction::Deleted));
    }

    #[tokio::test]
    async fn test_drop_leaves_room() {
        let hub = LocalHub::new();
        let sub = hub.subscribe("team-room").unwrap();
        assert_eq!(sub.room(), "team-room");
        assert_eq!(hub.subscriber_count("team-room"), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count("team-room"), 0);
        assert_eq!(hub.publish("team-room", RealtimeEvent::new("team-created", Value::Null)), 0);
    }

    #[tokio::test]
    async fn test_empty_rooms_are_forgotten() {
        let hub = LocalHub::new();
        let first = hub.subscribe("jobs-room").unwrap();
        let second = hub.subscribe("stories-room").unwrap();
        assert_eq!(hub.rooms().len(), 2);

        drop(first);
        assert_eq!(hub.publish("jobs-room", RealtimeEvent::new("jobs-created", Value::Null)), 0);
        assert_eq!(hub.rooms().len(), 1);

        drop(second);
        assert_eq!(hub.subscriber_count("stories-room"), 0);
        assert!(hub.rooms().is_empty());

        assert_eq!(hub.publish("lobby", RealtimeEvent::new("team-created", Value::Null)), 0);
        assert!(hub.rooms().is_empty());
    }
}
