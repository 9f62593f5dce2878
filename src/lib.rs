//! Event-sourced parking lots: an append-only log of car and spot events,
//! a live per-lot projection, time travel to any past instant, and paced
//! replay of history for animation.

mod clock;
mod error;
mod event;
mod fold;
mod log;
mod projector;
mod replay;
mod state;
mod store;
mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ReplayError, ValidationError};
pub use event::{DomainEvent, EventKind, Position, StoredEvent};
pub use fold::{fold, fold_stored, reduce, ReduceFn};
pub use self::log::EventLog;
pub use projector::Projector;
pub use replay::{replay, spawn_replay, AbortFlag, ReplayConfig, ReplayHandle, ReplayOutcome};
pub use state::{CarState, CarStatus, LotState, SpotOccupancy};
pub use store::{LotStore, LotStoreBuilder, Recorded};
pub use time::Timestamp;
