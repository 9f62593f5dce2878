//! Record a short morning in a lot, look at it from a few past instants,
//! then replay it at 4x speed.
//!
//! Run with `cargo run --example time_travel`.

use lotfold::{DomainEvent, LotStore, Position, ReplayConfig, Timestamp};
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = LotStore::builder()
        .replay_config(ReplayConfig::with_speed(4.0))
        .build();

    let t = |secs: &str| Timestamp::parse(&format!("2024-05-01T08:00:{secs}Z"));

    store.record(DomainEvent::car_entered("001", "A", Position::new(10.0, 10.0), t("00")?))?;
    store.record(DomainEvent::spot_occupied("001", "A", "S1", t("01")?))?;
    store.record(DomainEvent::car_entered("001", "B", Position::new(0.0, 0.0), t("02")?))?;
    store.record(DomainEvent::spot_vacated("001", "A", "S1", t("03")?))?;
    store.record(DomainEvent::car_exited("001", "A", t("04")?))?;
    store.record(DomainEvent::spot_occupied("001", "B", "S1", t("05")?))?;

    for secs in ["00", "01", "03", "05"] {
        let state = store.state_at("001", t(secs)?);
        let occupant = state.occupant("S1").unwrap_or("-");
        println!(
            "08:00:{secs}  cars={:?}  S1={occupant}",
            state.cars.keys().collect::<Vec<_>>()
        );
    }

    let started = Instant::now();
    let handle = store.replay("001", None, move |event| {
        println!(
            "+{:>5} ms  {} {}",
            started.elapsed().as_millis(),
            event.event.kind(),
            event.event.car_id()
        );
    });
    let outcome = handle.join().await?;
    println!("replayed {} events", outcome.delivered());

    Ok(())
}
