//! In-memory [`EventStore`] with optimistic concurrency.

use flightdeck_core::event::SerializedEvent;
use flightdeck_core::event_store::{EventStore, EventStoreError, StoreFuture};
use flightdeck_core::stream::{StreamId, Version};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Event store backed by a `HashMap` of streams.
///
/// Appends honour `expected_version` exactly like a durable store would, so
/// tests exercise the same conflict paths.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamId, Vec<SerializedEvent>>>,
}

impl InMemoryEventStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently in `stream_id`
    pub async fn stream_len(&self, stream_id: &StreamId) -> usize {
        self.streams.read().await.get(stream_id).map_or(0, Vec::len)
    }

    /// Event type names in `stream_id`, oldest first
    pub async fn event_types(&self, stream_id: &StreamId) -> Vec<String> {
        self.streams
            .read()
            .await
            .get(stream_id)
            .map(|events| events.iter().map(|e| e.event_type.clone()).collect())
            .unwrap_or_default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let mut streams = self.streams.write().await;
            let stream = streams.entry(stream_id.clone()).or_default();
            let current = Version::new(stream.len() as u64);

            if let Some(expected) = expected_version {
                if expected != current {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: current,
                    });
                }
            }

            let appended = events.len() as u64;
            stream.extend(events);
            Ok(current.advance(appended))
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> StoreFuture<'_, Vec<SerializedEvent>> {
        Box::pin(async move {
            let streams = self.streams.read().await;
            let skip = from_version.map_or(0, |v| usize::try_from(v.value()).unwrap_or(usize::MAX));
            Ok(streams
                .get(&stream_id)
                .map(|events| events.iter().skip(skip).cloned().collect())
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn event(name: &str) -> SerializedEvent {
        SerializedEvent::new(name.to_string(), vec![1, 2, 3], None)
    }

    #[tokio::test]
    async fn append_then_load_in_order() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("flight-ops");

        let v = store
            .append_events(stream.clone(), Some(Version::INITIAL), vec![event("A.v1"), event("B.v1")])
            .await
            .unwrap();
        assert_eq!(v, Version::new(2));

        store.append_events(stream.clone(), None, vec![event("C.v1")]).await.unwrap();

        let all = store.load_events(stream.clone(), None).await.unwrap();
        let names: Vec<_> = all.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(names, vec!["A.v1", "B.v1", "C.v1"]);

        let tail = store.load_events(stream.clone(), Some(Version::new(2))).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(store.stream_len(&stream).await, 3);
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("flight-ops");
        store.append_events(stream.clone(), None, vec![event("A.v1")]).await.unwrap();

        let err = store
            .append_events(stream.clone(), Some(Version::INITIAL), vec![event("B.v1")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EventStoreError::ConcurrencyConflict { actual, .. } if actual == Version::new(1)
        ));
        assert_eq!(store.event_types(&stream).await, vec!["A.v1".to_string()]);
    }

    #[tokio::test]
    async fn unknown_stream_loads_empty() {
        let store = InMemoryEventStore::new();
        let events = store.load_events(StreamId::new("nope"), None).await.unwrap();
        assert!(events.is_empty());
    }
}
