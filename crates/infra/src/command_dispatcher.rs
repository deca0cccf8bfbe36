//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus
//! ```
//!
//! Steps 1-4 are retried from scratch on an optimistic concurrency conflict,
//! up to `max_attempts` times. Services that must interleave their own work
//! between deciding and persisting use [`CommandDispatcher::load`] and
//! [`CommandDispatcher::commit`] directly.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stockflow_catalog::CatalogError;
use stockflow_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use stockflow_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure that survived every retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),
    /// A per-key lock could not be acquired in time.
    #[error("lock timeout: {0}")]
    LockTimeout(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("invalid release: {0}")]
    InvalidRelease(String),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    /// Failed to deserialize historical event payloads into the aggregate event type.
    #[error("failed to deserialize event history: {0}")]
    Deserialize(String),
    #[error("event store error: {0}")]
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    #[error("event publication failed: {0}")]
    Publish(String),
    #[error("product catalog unavailable: {0}")]
    CatalogUnavailable(String),
    /// The operation failed and some catalog adjustments could not be reversed.
    #[error("{cause}; catalog adjustments left in place: {unreverted}")]
    CompensationFailed {
        cause: Box<DispatchError>,
        unreverted: String,
    },
}

impl DispatchError {
    /// Transient failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::Concurrency(_) | DispatchError::LockTimeout(_))
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::NotFound(msg) => DispatchError::NotFound(msg),
            DomainError::AlreadyExists(msg) => DispatchError::AlreadyExists(msg),
            DomainError::InsufficientStock(msg) => DispatchError::InsufficientStock(msg),
            DomainError::InvalidRelease(msg) => DispatchError::InvalidRelease(msg),
            DomainError::InvalidTransition { from, to } => DispatchError::InvalidTransition { from, to },
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
        }
    }
}

impl From<CatalogError> for DispatchError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(id) => DispatchError::NotFound(format!("product {id}")),
            e @ CatalogError::InsufficientStock { .. } => DispatchError::InsufficientStock(e.to_string()),
            CatalogError::Unavailable(msg) => DispatchError::CatalogUnavailable(msg),
        }
    }
}

/// A rehydrated aggregate plus the stream version it was read at.
#[derive(Debug, Clone)]
pub struct Loaded<A> {
    pub aggregate_id: AggregateId,
    pub aggregate: A,
    pub version: u64,
}

/// Result of a successful dispatch: the aggregate after the new events, and the events.
#[derive(Debug, Clone)]
pub struct Committed<A> {
    pub aggregate: A,
    pub events: Vec<StoredEvent>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are persisted before publication; if append fails nothing is
/// published. If publication fails the events are already durable and the
/// caller gets `DispatchError::Publish`.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    max_attempts: u32,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command, retrying on optimistic concurrency conflicts.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: stockflow_events::Event + Serialize + DeserializeOwned,
    {
        let mut attempt = 1;
        loop {
            let loaded = self.load(aggregate_id, &make_aggregate)?;
            let decided = loaded.aggregate.handle(command).map_err(DispatchError::from)?;

            match self.commit(loaded, aggregate_type, decided) {
                Err(DispatchError::Concurrency(msg)) if attempt < self.max_attempts => {
                    tracing::debug!(
                        %aggregate_id,
                        aggregate_type,
                        attempt,
                        error = %msg,
                        "concurrency conflict, retrying"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Load and rehydrate one aggregate.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Loaded<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        Ok(Loaded {
            aggregate_id,
            aggregate,
            version: stream_version(&history),
        })
    }

    /// Rehydrate every aggregate of a type from one consistent store snapshot.
    pub fn load_all<A>(
        &self,
        aggregate_type: &str,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let streams = self.store.load_streams(aggregate_type)?;
        let mut out = Vec::with_capacity(streams.len());
        for stream in streams {
            let Some(first) = stream.first() else {
                continue;
            };
            let aggregate_id = first.aggregate_id;
            validate_loaded_stream(aggregate_id, &stream)?;

            let mut aggregate = make_aggregate(aggregate_id);
            apply_history::<A>(&mut aggregate, &stream)?;
            out.push(aggregate);
        }
        Ok(out)
    }

    /// Append already-decided events against the loaded version, then publish.
    pub fn commit<A>(
        &self,
        loaded: Loaded<A>,
        aggregate_type: &str,
        decided: Vec<A::Event>,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: stockflow_events::Event + Serialize,
    {
        let Loaded {
            aggregate_id,
            mut aggregate,
            version,
        } = loaded;

        if decided.is_empty() {
            return Ok(Committed {
                aggregate,
                events: vec![],
            });
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, ExpectedVersion::Exact(version))?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(Committed {
            aggregate,
            events: committed,
        })
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
