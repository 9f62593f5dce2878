use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::event::{DomainEvent, StoredEvent};
use crate::time::Timestamp;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// An in-memory, append-only event log partitioned into streams (one per
/// lot).
///
/// Each stream is kept sorted by `occurred_at`, so events may arrive out of
/// order and still read back in time order. Events sharing an `occurred_at`
/// keep the order they were appended in.
///
/// The log is `Send + Sync`: appends take a write lock and serialize against
/// each other and against queries, queries share a read lock. Wrap it in an
/// `Arc` to share it.
///
/// # Panics
///
/// Every method panics if the inner [`RwLock`] is poisoned (a writer
/// panicked while holding it). This is treated as an invariant violation.
pub struct EventLog {
    streams: RwLock<HashMap<String, Vec<StoredEvent>>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let streams = self.streams.read().expect("event log lock poisoned");
        f.debug_struct("EventLog")
            .field("streams", &streams.len())
            .field("events", &streams.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create an empty log that stamps ingestion times from the system
    /// clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty log that stamps ingestion times from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        EventLog {
            streams: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Append an event to `stream_id`.
    ///
    /// Validates the event, assigns a fresh `event_id` and a `created_at`
    /// from the log's clock, and inserts it after every event of the stream
    /// whose `occurred_at` is less than or equal to its own. Returns the
    /// stored envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the event fails
    /// [`DomainEvent::validate`] or names a lot other than `stream_id`.
    /// Nothing is written in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use lotfold::{DomainEvent, EventLog, Timestamp};
    ///
    /// let log = EventLog::new();
    /// let later = Timestamp::parse("2024-05-01T08:00:10Z").unwrap();
    /// let earlier = Timestamp::parse("2024-05-01T08:00:00Z").unwrap();
    ///
    /// log.append("001", DomainEvent::car_exited("001", "A", later)).unwrap();
    /// log.append("001", DomainEvent::car_exited("001", "B", earlier)).unwrap();
    ///
    /// let events = log.query_by_time("001", None, None);
    /// assert_eq!(events[0].event.car_id(), "B");
    /// assert_eq!(events[1].event.car_id(), "A");
    /// ```
    pub fn append(&self, stream_id: &str, event: DomainEvent) -> Result<StoredEvent, ValidationError> {
        if let Err(e) = check(stream_id, &event) {
            warn!("lotfold: rejected {} for stream '{stream_id}': {e}", event.kind());
            return Err(e);
        }

        let stored = StoredEvent {
            event_id: Uuid::new_v4(),
            stream_id: stream_id.to_string(),
            occurred_at: event.occurred_at(),
            created_at: self.clock.now(),
            event,
        };

        let mut streams = self.streams.write().expect("event log lock poisoned");
        let stream = streams.entry(stream_id.to_string()).or_default();
        let at = stream.partition_point(|e| e.occurred_at <= stored.occurred_at);
        let out_of_order = at < stream.len();
        stream.insert(at, stored.clone());

        debug!(
            "lotfold: appended {} {} to '{stream_id}' at {} (position {at}{})",
            stored.event.kind(),
            stored.event_id,
            stored.occurred_at,
            if out_of_order { ", out of order" } else { "" }
        );
        Ok(stored)
    }

    /// Events of `stream_id` with `from <= occurred_at <= to`, ascending by
    /// `occurred_at`.
    ///
    /// Either bound may be `None` for an open end. An unknown stream, or a
    /// range with `from > to`, yields an empty vector.
    pub fn query_by_time(
        &self,
        stream_id: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Vec<StoredEvent> {
        let streams = self.streams.read().expect("event log lock poisoned");
        let Some(stream) = streams.get(stream_id) else {
            return Vec::new();
        };

        let start = from.map_or(0, |from| stream.partition_point(|e| e.occurred_at < from));
        let end = to.map_or(stream.len(), |to| {
            stream.partition_point(|e| e.occurred_at <= to)
        });
        if start >= end {
            return Vec::new();
        }
        stream[start..end].to_vec()
    }

    /// Number of events in `stream_id`.
    pub fn len(&self, stream_id: &str) -> usize {
        let streams = self.streams.read().expect("event log lock poisoned");
        streams.get(stream_id).map_or(0, Vec::len)
    }

    /// Number of events across all streams.
    pub fn total_len(&self) -> usize {
        let streams = self.streams.read().expect("event log lock poisoned");
        streams.values().map(Vec::len).sum()
    }

    /// `true` if no event has been appended to any stream.
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Ids of every stream that holds at least one event, sorted.
    pub fn stream_ids(&self) -> Vec<String> {
        let streams = self.streams.read().expect("event log lock poisoned");
        let mut ids: Vec<String> = streams.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn check(stream_id: &str, event: &DomainEvent) -> Result<(), ValidationError> {
    event.validate()?;
    if event.lot_id() != stream_id {
        return Err(ValidationError::StreamMismatch {
            stream_id: stream_id.to_string(),
            lot_id: event.lot_id().to_string(),
        });
    }
    Ok(())
}
