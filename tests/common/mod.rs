#![allow(dead_code)]

use lotfold::{DomainEvent, EventLog, FixedClock, LotState, Position, Timestamp};
use std::sync::Arc;

pub const LOT: &str = "001";

/// 2024-05-01T08:00:00.000Z, the origin every fixture offset is relative to.
pub const BASE_MILLIS: i64 = 1_714_550_400_000;

pub fn at(offset_millis: i64) -> Timestamp {
    Timestamp::from_millis(BASE_MILLIS + offset_millis).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(at(0)))
}

pub fn fixed_log() -> EventLog {
    EventLog::with_clock(fixed_clock())
}

pub fn empty() -> LotState {
    LotState::empty(LOT, at(0))
}

pub fn entered(car: &str, x: f64, y: f64, offset: i64) -> DomainEvent {
    DomainEvent::car_entered(LOT, car, Position::new(x, y), at(offset))
}

pub fn moved(car: &str, to: (f64, f64), offset: i64) -> DomainEvent {
    DomainEvent::car_moved(
        LOT,
        car,
        Position::new(0.0, 0.0),
        Position::new(to.0, to.1),
        at(offset),
    )
}

pub fn exited(car: &str, offset: i64) -> DomainEvent {
    DomainEvent::car_exited(LOT, car, at(offset))
}

pub fn occupied(car: &str, spot: &str, offset: i64) -> DomainEvent {
    DomainEvent::spot_occupied(LOT, car, spot, at(offset))
}

pub fn vacated(car: &str, spot: &str, offset: i64) -> DomainEvent {
    DomainEvent::spot_vacated(LOT, car, spot, at(offset))
}

/// Append every event to `LOT`, panicking on rejection.
pub fn append_all(log: &EventLog, events: &[DomainEvent]) {
    for event in events {
        log.append(LOT, event.clone()).unwrap();
    }
}

/// A small day in the lot: A parks in S1, B arrives and waits, A leaves,
/// B takes S1.
pub fn busy_morning() -> Vec<DomainEvent> {
    vec![
        entered("A", 10.0, 10.0, 0),
        moved("A", (20.0, 10.0), 1_000),
        occupied("A", "S1", 2_000),
        entered("B", 0.0, 0.0, 3_000),
        vacated("A", "S1", 4_000),
        exited("A", 5_000),
        moved("B", (20.0, 10.0), 6_000),
        occupied("B", "S1", 7_000),
    ]
}
