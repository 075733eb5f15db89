//! Event store abstraction used as the engine's journal.
//!
//! The engine keeps its authoritative state in memory and appends every
//! accepted change to a journal stream. Anything that can append and replay a
//! stream of [`SerializedEvent`]s with optimistic concurrency can serve as the
//! journal; `flightdeck-testing` ships an in-memory implementation.

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`EventStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EventStoreError>> + Send + 'a>>;

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: expected version doesn't match current version.
    #[error("Concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream ID where the conflict occurred.
        stream_id: StreamId,
        /// The version we expected the stream to be at.
        expected: Version,
        /// The actual current version of the stream.
        actual: Version,
    },

    /// Stream not found in the event store.
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    /// Backend storage error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// General I/O error.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Append-only journal of event streams.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the store can be
/// held as `Arc<dyn EventStore>` inside the engine environment and captured by
/// journal effects.
pub trait EventStore: Send + Sync {
    /// Append events to a stream.
    ///
    /// `expected_version` of `Some(v)` asserts the stream is currently at `v`;
    /// `None` appends unconditionally. Returns the stream version after the
    /// append (a stream at version 5 that receives 3 events returns `Version(8)`).
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the stream moved past `expected_version`
    /// - `DatabaseError`: the backend rejected the write
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> StoreFuture<'_, Version>;

    /// Load events from a stream, oldest first.
    ///
    /// `from_version` of `Some(v)` skips the first `v` events. A stream that
    /// does not exist yields an empty vector.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: the backend read failed
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> StoreFuture<'_, Vec<SerializedEvent>>;
}
