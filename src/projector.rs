use crate::clock::{Clock, SystemClock};
use crate::event::{DomainEvent, StoredEvent};
use crate::fold::{fold_stored, reduce};
use crate::state::LotState;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Live per-lot state, maintained incrementally as events arrive.
///
/// Holds one [`LotState`] per stream. Applying events one at a time yields
/// the same state as a batch [`fold`](crate::fold) of the same events from
/// an empty state.
///
/// Empty states are stamped with the projector's clock at the moment they
/// are created.
///
/// # Panics
///
/// Every method panics if the inner [`RwLock`] is poisoned (a writer
/// panicked while holding it). This is treated as an invariant violation.
pub struct Projector {
    states: RwLock<HashMap<String, LotState>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states = self.states.read().expect("projector lock poisoned");
        f.debug_struct("Projector")
            .field("streams", &states.len())
            .finish()
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector {
    /// Create a projector using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a projector that stamps empty states from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Projector {
            states: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Fold `event` onto the cached state of its lot and return the result.
    ///
    /// A lot seen for the first time starts from an empty state.
    pub fn apply(&self, event: &DomainEvent) -> LotState {
        let lot_id = event.lot_id();
        let mut states = self.states.write().expect("projector lock poisoned");
        let state = states
            .remove(lot_id)
            .unwrap_or_else(|| LotState::empty(lot_id, self.clock.now()));
        let next = reduce(state, event);
        states.insert(lot_id.to_string(), next.clone());

        debug!(
            "lotfold: projected {} on '{lot_id}' ({} cars, {} spots)",
            event.kind(),
            next.cars.len(),
            next.spots.len()
        );
        next
    }

    /// The cached state of `stream_id`.
    ///
    /// An unseen stream yields a fresh empty state; it is not stored.
    pub fn get(&self, stream_id: &str) -> LotState {
        let states = self.states.read().expect("projector lock poisoned");
        match states.get(stream_id) {
            Some(state) => state.clone(),
            None => LotState::empty(stream_id, self.clock.now()),
        }
    }

    /// Replace the cached state of `stream_id` with a batch fold of
    /// `events` from an empty state, and return it.
    pub fn rebuild(&self, stream_id: &str, events: &[StoredEvent]) -> LotState {
        let state = fold_stored(LotState::empty(stream_id, self.clock.now()), events);
        let mut states = self.states.write().expect("projector lock poisoned");
        states.insert(stream_id.to_string(), state.clone());
        debug!(
            "lotfold: rebuilt '{stream_id}' from {} events",
            events.len()
        );
        state
    }

    /// Drop the cached state of `stream_id`, returning it if there was one.
    pub fn reset(&self, stream_id: &str) -> Option<LotState> {
        let mut states = self.states.write().expect("projector lock poisoned");
        states.remove(stream_id)
    }

    /// Ids of every stream with a cached state, sorted.
    pub fn stream_ids(&self) -> Vec<String> {
        let states = self.states.read().expect("projector lock poisoned");
        let mut ids: Vec<String> = states.keys().cloned().collect();
        ids.sort();
        ids
    }
}
