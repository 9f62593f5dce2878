use crate::event::{DomainEvent, StoredEvent};
use crate::state::{CarState, CarStatus, LotState, SpotOccupancy};

/// A pure function that folds an event into state.
///
/// Reducers receive owned state and return owned state. They must be pure
/// (no I/O, no clock reads) so that the live and time-travel views agree.
///
/// # Examples
///
/// ```
/// use lotfold::{reduce, LotState, ReduceFn};
///
/// let reducer: ReduceFn<LotState> = reduce;
/// ```
pub type ReduceFn<S> = fn(S, &DomainEvent) -> S;

/// Apply a single event to a lot state.
///
/// Total: events that refer to unknown cars or to spots held by someone
/// else are absorbed without error.
///
/// | Event          | Effect                                              | Advances `time`       |
/// |----------------|-----------------------------------------------------|-----------------------|
/// | `CarEntered`   | upsert the car at `pos`                             | always                |
/// | `CarMoved`     | move the car to `to`, only if it is already present | only when it moved    |
/// | `CarExited`    | remove the car                                      | always                |
/// | `SpotOccupied` | the car becomes the spot's occupant                 | always                |
/// | `SpotVacated`  | free the spot, only if the car is its occupant      | always                |
pub fn reduce(mut state: LotState, event: &DomainEvent) -> LotState {
    match event {
        DomainEvent::CarEntered {
            car_id,
            pos,
            occurred_at,
            ..
        } => {
            state.cars.insert(
                car_id.clone(),
                CarState {
                    car_id: car_id.clone(),
                    pos: *pos,
                    status: CarStatus::In,
                    updated_at: *occurred_at,
                },
            );
            state.time = *occurred_at;
        }
        DomainEvent::CarMoved {
            car_id,
            to,
            occurred_at,
            ..
        } => {
            // A move for a car we never saw enter is dropped, and so is its
            // timestamp.
            if let Some(car) = state.cars.get_mut(car_id) {
                car.pos = *to;
                car.updated_at = *occurred_at;
                state.time = *occurred_at;
            }
        }
        DomainEvent::CarExited {
            car_id,
            occurred_at,
            ..
        } => {
            state.cars.remove(car_id);
            state.time = *occurred_at;
        }
        DomainEvent::SpotOccupied {
            car_id,
            spot_id,
            occurred_at,
            ..
        } => {
            state.spots.insert(
                spot_id.clone(),
                SpotOccupancy {
                    spot_id: spot_id.clone(),
                    car_id: car_id.clone(),
                    since: *occurred_at,
                },
            );
            state.time = *occurred_at;
        }
        DomainEvent::SpotVacated {
            car_id,
            spot_id,
            occurred_at,
            ..
        } => {
            // A stale vacate must not evict a car that took the spot since.
            if state.occupant(spot_id) == Some(car_id.as_str()) {
                state.spots.remove(spot_id);
            }
            state.time = *occurred_at;
        }
    }
    state
}

/// Fold an ordered sequence of events onto `state`.
///
/// Split-invariant: folding `events[..k]` and then `events[k..]` yields the
/// same state as folding all of `events` at once.
///
/// # Examples
///
/// ```
/// use lotfold::{fold, DomainEvent, LotState, Position, Timestamp};
///
/// let t0 = Timestamp::parse("2024-05-01T08:00:00Z").unwrap();
/// let t1 = Timestamp::parse("2024-05-01T08:00:05Z").unwrap();
/// let events = [
///     DomainEvent::car_entered("001", "A", Position::new(10.0, 10.0), t0),
///     DomainEvent::spot_occupied("001", "A", "S1", t1),
/// ];
///
/// let state = fold(LotState::empty("001", t0), &events);
/// assert_eq!(state.occupant("S1"), Some("A"));
/// assert_eq!(state.time, t1);
/// ```
pub fn fold<'a, I>(state: LotState, events: I) -> LotState
where
    I: IntoIterator<Item = &'a DomainEvent>,
{
    events.into_iter().fold(state, reduce)
}

/// Fold the payloads of stored events onto `state`.
pub fn fold_stored(state: LotState, events: &[StoredEvent]) -> LotState {
    fold(state, events.iter().map(|stored| &stored.event))
}
