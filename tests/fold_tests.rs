mod common;

use common::{LOT, append_all, at, busy_morning, empty, entered, exited, fixed_log, moved, occupied, vacated};
use lotfold::{fold, fold_stored, reduce, CarStatus, DomainEvent, LotState, Position};

#[test]
fn test_fold_empty_sequence_is_identity() {
    let none: [DomainEvent; 0] = [];
    let state = fold(empty(), &none);
    assert_eq!(state, empty());
}

#[test]
fn test_car_entered_upserts_and_advances_time() {
    let state = fold(empty(), &[entered("A", 10.0, 10.0, 100)]);
    let car = state.car("A").unwrap();
    assert_eq!(car.pos, Position::new(10.0, 10.0));
    assert_eq!(car.status, CarStatus::In);
    assert_eq!(car.updated_at, at(100));
    assert_eq!(state.time, at(100));

    // Re-entering overwrites the position.
    let state = reduce(state, &entered("A", 5.0, 5.0, 200));
    assert_eq!(state.car("A").unwrap().pos, Position::new(5.0, 5.0));
    assert_eq!(state.cars.len(), 1);
}

#[test]
fn test_car_moved_updates_known_car() {
    let state = fold(
        empty(),
        &[entered("A", 0.0, 0.0, 0), moved("A", (3.0, 4.0), 1_000)],
    );
    let car = state.car("A").unwrap();
    assert_eq!(car.pos, Position::new(3.0, 4.0));
    assert_eq!(car.updated_at, at(1_000));
    assert_eq!(state.time, at(1_000));
}

#[test]
fn test_car_moved_unknown_car_is_noop_without_time_advance() {
    let before = fold(empty(), &[entered("A", 0.0, 0.0, 100)]);
    let after = reduce(before.clone(), &moved("ghost", (3.0, 4.0), 5_000));
    assert_eq!(after, before);
    assert_eq!(after.time, at(100));
    assert!(after.car("ghost").is_none());
}

#[test]
fn test_car_exited_removes_and_advances_time() {
    let state = fold(
        empty(),
        &[entered("A", 0.0, 0.0, 0), exited("A", 1_000)],
    );
    assert!(state.cars.is_empty());
    assert_eq!(state.time, at(1_000));

    // Exiting a car that is not there still advances time.
    let state = reduce(state, &exited("nobody", 2_000));
    assert_eq!(state.time, at(2_000));
}

#[test]
fn test_spot_occupied_records_since() {
    let state = fold(empty(), &[occupied("A", "S1", 1_500)]);
    let spot = state.spots.get("S1").unwrap();
    assert_eq!(spot.car_id, "A");
    assert_eq!(spot.since, at(1_500));
    assert_eq!(state.time, at(1_500));
}

#[test]
fn test_spot_vacated_by_occupant_frees_spot() {
    let state = fold(
        empty(),
        &[occupied("A", "S1", 0), vacated("A", "S1", 1_000)],
    );
    assert!(state.spots.is_empty());
    assert_eq!(state.time, at(1_000));
}

#[test]
fn test_stale_vacate_keeps_new_occupant() {
    let state = fold(
        empty(),
        &[occupied("A", "S1", 0), occupied("B", "S1", 1_000)],
    );
    let after = reduce(state.clone(), &vacated("A", "S1", 2_000));

    assert_eq!(after.occupant("S1"), Some("B"));
    assert_eq!(after.spots, state.spots);
    // The rejected vacate still moves the clock.
    assert_eq!(after.time, at(2_000));
}

#[test]
fn test_time_travel_scenario() {
    let log = fixed_log();
    append_all(
        &log,
        &[entered("A", 10.0, 10.0, 0), occupied("A", "S1", 1_000)],
    );

    let history = log.query_by_time(LOT, None, Some(at(1_000)));
    let state = fold_stored(LotState::empty(LOT, at(1_000)), &history);
    assert_eq!(state.cars.len(), 1);
    assert_eq!(state.car("A").unwrap().pos, Position::new(10.0, 10.0));
    assert_eq!(state.occupant("S1"), Some("A"));

    append_all(&log, &[vacated("B", "S1", 2_000)]);
    let history = log.query_by_time(LOT, None, None);
    let state = fold_stored(LotState::empty(LOT, at(2_000)), &history);
    assert_eq!(state.occupant("S1"), Some("A"));
    assert_eq!(state.spots.len(), 1);
}

#[test]
fn test_time_travel_before_first_event_is_empty() {
    let log = fixed_log();
    append_all(&log, &busy_morning());

    let history = log.query_by_time(LOT, None, Some(at(-1)));
    let state = fold_stored(LotState::empty(LOT, at(-1)), &history);
    assert!(state.is_empty());
    assert_eq!(state.time, at(-1));
}

#[test]
fn test_busy_morning_final_state() {
    let state = fold(empty(), &busy_morning());
    assert!(state.car("A").is_none());
    assert_eq!(state.car("B").unwrap().pos, Position::new(20.0, 10.0));
    assert_eq!(state.occupant("S1"), Some("B"));
    assert_eq!(state.time, at(7_000));
}

#[test]
fn test_state_serializes_camel_case() {
    let state = fold(empty(), &[entered("A", 1.0, 2.0, 0), occupied("A", "S1", 0)]);
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["lotId"], LOT);
    assert_eq!(json["cars"]["A"]["status"], "IN");
    assert_eq!(json["cars"]["A"]["updatedAt"], "2024-05-01T08:00:00.000Z");
    assert_eq!(json["spots"]["S1"]["carId"], "A");
    assert_eq!(json["spots"]["S1"]["since"], "2024-05-01T08:00:00.000Z");
}
