use std::collections::HashMap;
use std::sync::RwLock;

use stockflow_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// A single `RwLock` guards every stream, so `load_streams` sees either all of
/// a concurrent append or none of it.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn poisoned() -> EventStoreError {
        EventStoreError::Unavailable("lock poisoned".to_string())
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;

        let stream = streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn load_streams(&self, aggregate_type: &str) -> Result<Vec<Vec<StoredEvent>>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams
            .values()
            .filter(|s| s.first().is_some_and(|e| e.aggregate_type == aggregate_type))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({ "n": 1 }),
        }
    }

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let first = store
            .append(vec![event(id, "a"), event(id, "a")], ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

        let second = store.append(vec![event(id, "a")], ExpectedVersion::Exact(2)).unwrap();
        assert_eq!(second[0].sequence_number, 3);
        assert_eq!(store.load_stream(id).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![event(id, "a")], ExpectedVersion::Exact(0)).unwrap();

        let err = store.append(vec![event(id, "a")], ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
    }

    #[test]
    fn mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let err = store
            .append(
                vec![event(AggregateId::new(), "a"), event(AggregateId::new(), "a")],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }

    #[test]
    fn load_streams_filters_by_aggregate_type() {
        let store = InMemoryEventStore::new();
        for _ in 0..3 {
            store.append(vec![event(AggregateId::new(), "a")], ExpectedVersion::Exact(0)).unwrap();
        }
        store.append(vec![event(AggregateId::new(), "b")], ExpectedVersion::Exact(0)).unwrap();

        assert_eq!(store.load_streams("a").unwrap().len(), 3);
        assert_eq!(store.load_streams("b").unwrap().len(), 1);
        assert!(store.load_streams("c").unwrap().is_empty());
    }
}
