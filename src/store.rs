//! The command and query surface over one event log and its live
//! projection.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::event::{DomainEvent, StoredEvent};
use crate::fold::fold_stored;
use crate::log::EventLog;
use crate::projector::Projector;
use crate::replay::{spawn_replay, ReplayConfig, ReplayHandle};
use crate::state::LotState;
use crate::time::Timestamp;

/// Result of a successful [`LotStore::record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recorded {
    /// The event as appended to the log.
    pub stored: StoredEvent,
    /// The lot's live state after applying it.
    pub current: LotState,
}

/// Builder for [`LotStore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lotfold::{FixedClock, LotStore, ReplayConfig, Timestamp};
///
/// let store = LotStore::builder()
///     .clock(Arc::new(FixedClock(Timestamp::from_millis(0).unwrap())))
///     .replay_config(ReplayConfig::with_speed(10.0))
///     .build();
/// assert!(store.log().is_empty());
/// ```
pub struct LotStoreBuilder {
    clock: Arc<dyn Clock>,
    replay_config: ReplayConfig,
}

impl LotStoreBuilder {
    /// Clock used for ingestion times, defaulted `occurredAt` values, and
    /// empty-state stamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration used by [`LotStore::replay`].
    pub fn replay_config(mut self, config: ReplayConfig) -> Self {
        self.replay_config = config;
        self
    }

    /// Build an empty store.
    pub fn build(self) -> LotStore {
        LotStore {
            log: EventLog::with_clock(Arc::clone(&self.clock)),
            projector: Projector::with_clock(Arc::clone(&self.clock)),
            clock: self.clock,
            replay_config: self.replay_config,
            write: Mutex::new(()),
        }
    }
}

/// An event log, its live projection, and the queries over both.
///
/// Every write goes through [`record`](LotStore::record), which appends to
/// the log and applies to the projector under one lock, so the live view
/// sees events in the order they entered the log. Reads go straight to the
/// log or the projector and run concurrently.
///
/// # Examples
///
/// ```
/// use lotfold::{DomainEvent, LotStore, Position, Timestamp};
///
/// let store = LotStore::new();
/// let t0 = Timestamp::parse("2024-05-01T08:00:00Z").unwrap();
/// let t1 = Timestamp::parse("2024-05-01T08:01:00Z").unwrap();
///
/// store.record(DomainEvent::car_entered("001", "A", Position::new(10.0, 10.0), t0)).unwrap();
/// store.record(DomainEvent::car_exited("001", "A", t1)).unwrap();
///
/// assert!(store.current("001").cars.is_empty());
/// assert!(store.state_at("001", t0).car("A").is_some());
/// ```
pub struct LotStore {
    log: EventLog,
    projector: Projector,
    clock: Arc<dyn Clock>,
    replay_config: ReplayConfig,
    write: Mutex<()>,
}

impl fmt::Debug for LotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LotStore")
            .field("log", &self.log)
            .field("projector", &self.projector)
            .field("replay_config", &self.replay_config)
            .finish()
    }
}

impl Default for LotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LotStore {
    /// An empty store on the system clock with the default replay config.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a store.
    pub fn builder() -> LotStoreBuilder {
        LotStoreBuilder {
            clock: Arc::new(SystemClock),
            replay_config: ReplayConfig::default(),
        }
    }

    /// Append `event` to its lot's stream and apply it to the live view.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the log rejects the event; neither
    /// the log nor the live view changes in that case.
    ///
    /// # Panics
    ///
    /// Panics if the write lock is poisoned.
    pub fn record(&self, event: DomainEvent) -> Result<Recorded, ValidationError> {
        let _guard = self.write.lock().expect("store write lock poisoned");
        let lot_id = event.lot_id().to_string();
        let stored = self.log.append(&lot_id, event)?;
        let current = self.projector.apply(&stored.event);
        Ok(Recorded { stored, current })
    }

    /// Decode a loosely typed record and [`record`](LotStore::record) it.
    ///
    /// A record without `occurredAt` is stamped with the store's clock.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the record fails
    /// [`DomainEvent::from_json`] or is rejected by the log.
    pub fn record_json(&self, record: Value) -> Result<Recorded, ValidationError> {
        let event = DomainEvent::from_json(record, self.clock.now())?;
        self.record(event)
    }

    /// Live state of `lot_id`. Empty if the lot has no events.
    pub fn current(&self, lot_id: &str) -> LotState {
        self.projector.get(lot_id)
    }

    /// State of `lot_id` as of `at`: every event with `occurred_at <= at`
    /// folded onto an empty state stamped `at`.
    pub fn state_at(&self, lot_id: &str, at: Timestamp) -> LotState {
        let events = self.log.query_by_time(lot_id, None, Some(at));
        debug!(
            "lotfold: time travel on '{lot_id}' to {at} over {} events",
            events.len()
        );
        fold_stored(LotState::empty(lot_id, at), &events)
    }

    /// Events of `lot_id` in `[from, to]`, ascending. See
    /// [`EventLog::query_by_time`].
    pub fn events(
        &self,
        lot_id: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Vec<StoredEvent> {
        self.log.query_by_time(lot_id, from, to)
    }

    /// Replay `lot_id` from `start` onward with the store's replay config.
    ///
    /// The events are read once, up front; events recorded after this call
    /// are not part of the replay.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn replay<F>(&self, lot_id: &str, start: Option<Timestamp>, on_event: F) -> ReplayHandle
    where
        F: FnMut(StoredEvent) + Send + 'static,
    {
        self.replay_with(lot_id, start, self.replay_config.clone(), on_event)
    }

    /// Like [`replay`](LotStore::replay) with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn replay_with<F>(
        &self,
        lot_id: &str,
        start: Option<Timestamp>,
        config: ReplayConfig,
        on_event: F,
    ) -> ReplayHandle
    where
        F: FnMut(StoredEvent) + Send + 'static,
    {
        let events = self.log.query_by_time(lot_id, start, None);
        spawn_replay(events, config, on_event)
    }

    /// The underlying event log.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// The underlying live projection.
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// The replay configuration used by [`replay`](LotStore::replay).
    pub fn replay_config(&self) -> &ReplayConfig {
        &self.replay_config
    }
}
