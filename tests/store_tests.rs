mod common;

use common::{LOT, at, busy_morning, empty, entered, exited, fixed_clock, occupied, vacated};
use lotfold::{fold, LotState, LotStore, Position, ReplayConfig, ReplayOutcome, ValidationError};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn store() -> LotStore {
    LotStore::builder().clock(fixed_clock()).build()
}

#[test]
fn test_record_returns_stored_and_current() {
    let store = store();
    let recorded = store.record(entered("A", 10.0, 10.0, 0)).unwrap();

    assert_eq!(recorded.stored.stream_id, LOT);
    assert_eq!(recorded.stored.created_at, at(0));
    assert_eq!(
        recorded.current.car("A").unwrap().pos,
        Position::new(10.0, 10.0)
    );
    assert_eq!(recorded.current, store.current(LOT));
}

#[test]
fn test_rejected_record_changes_nothing() {
    let store = store();
    store.record(entered("A", 0.0, 0.0, 0)).unwrap();
    let before = store.current(LOT);

    let err = store.record(exited("", 100)).unwrap_err();
    assert!(matches!(err, ValidationError::MissingField { field: "carId", .. }));
    assert_eq!(store.current(LOT), before);
    assert_eq!(store.log().len(LOT), 1);
}

#[test]
fn test_current_of_unseen_lot_is_empty() {
    let store = store();
    assert_eq!(store.current("999"), LotState::empty("999", at(0)));
    assert!(store.events("999", None, None).is_empty());
}

#[test]
fn test_live_and_time_travel_agree_at_the_end() {
    let store = store();
    let events = busy_morning();
    for event in &events {
        store.record(event.clone()).unwrap();
    }

    let live = store.current(LOT);
    assert_eq!(live, fold(empty(), &events));

    let travelled = store.state_at(LOT, at(7_000));
    assert_eq!(travelled.cars, live.cars);
    assert_eq!(travelled.spots, live.spots);
    assert_eq!(travelled.time, at(7_000));
}

#[test]
fn test_state_at_past_instant() {
    let store = store();
    for event in busy_morning() {
        store.record(event).unwrap();
    }

    let mid = store.state_at(LOT, at(3_500));
    assert_eq!(mid.occupant("S1"), Some("A"));
    assert!(mid.car("A").is_some());
    assert_eq!(mid.car("B").unwrap().pos, Position::new(0.0, 0.0));
    assert_eq!(mid.time, at(3_000));
}

#[test]
fn test_stale_vacate_scenario() {
    let store = store();
    store.record(entered("A", 10.0, 10.0, 0)).unwrap();
    store.record(occupied("A", "S1", 1_000)).unwrap();

    let at_t1 = store.state_at(LOT, at(1_000));
    assert_eq!(at_t1.car("A").unwrap().pos, Position::new(10.0, 10.0));
    assert_eq!(at_t1.occupant("S1"), Some("A"));

    store.record(vacated("B", "S1", 2_000)).unwrap();
    assert_eq!(store.current(LOT).occupant("S1"), Some("A"));
    assert_eq!(store.state_at(LOT, at(2_000)).occupant("S1"), Some("A"));
}

#[test]
fn test_record_json_decodes_and_defaults_time() {
    let store = store();
    let recorded = store
        .record_json(json!({
            "type": "CarEntered",
            "lotId": LOT,
            "carId": "A",
            "pos": {"x": 1.0, "y": 2.0}
        }))
        .unwrap();

    assert_eq!(recorded.stored.occurred_at, at(0));
    assert!(recorded.current.car("A").is_some());
}

#[test]
fn test_record_json_rejects_missing_field() {
    let store = store();
    let err = store
        .record_json(json!({"type": "SpotOccupied", "lotId": LOT, "carId": "A"}))
        .unwrap_err();
    assert_eq!(err.to_string(), "SpotOccupied: missing required field `spotId`");
    assert!(store.log().is_empty());
}

#[test]
fn test_recorded_serializes_for_the_wire() {
    let store = store();
    let recorded = store.record(occupied("A", "S1", 0)).unwrap();
    let json = serde_json::to_value(&recorded).unwrap();

    assert_eq!(json["stored"]["streamId"], LOT);
    assert_eq!(json["stored"]["event"]["type"], "SpotOccupied");
    assert_eq!(json["stored"]["event"]["spotId"], "S1");
    assert_eq!(json["current"]["spots"]["S1"]["carId"], "A");
}

#[tokio::test(start_paused = true)]
async fn test_replay_from_start_instant() {
    let store = LotStore::builder()
        .clock(fixed_clock())
        .replay_config(ReplayConfig::with_speed(100.0))
        .build();
    for event in busy_morning() {
        store.record(event).unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handle = store.replay(LOT, Some(at(4_000)), move |event| {
        sink.lock().unwrap().push(event.occurred_at)
    });
    let outcome = handle.join().await.unwrap();

    assert_eq!(outcome, ReplayOutcome::Completed { delivered: 4 });
    assert_eq!(
        *seen.lock().unwrap(),
        [at(4_000), at(5_000), at(6_000), at(7_000)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_replay_with_invalid_config_reports_error() {
    let store = store();
    store.record(entered("A", 0.0, 0.0, 0)).unwrap();

    let handle = store.replay_with(LOT, None, ReplayConfig::with_speed(0.0), |_| {});
    assert!(handle.join().await.is_err());
}
