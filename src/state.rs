//! The materialized view of one lot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::Position;
use crate::time::Timestamp;

/// Presence status of a car in the lot.
///
/// Cars that exit are removed from the view rather than marked, so `In` is
/// the only status a stored car can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarStatus {
    /// The car is inside the lot.
    In,
}

/// Last known whereabouts of a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarState {
    /// The car.
    pub car_id: String,
    /// Last known position.
    pub pos: Position,
    /// Always [`CarStatus::In`].
    pub status: CarStatus,
    /// Business time of the event that last touched this car.
    pub updated_at: Timestamp,
}

/// The current occupant of a spot.
///
/// Dwell time is left to consumers: subtract `since` from their own "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotOccupancy {
    /// The spot.
    pub spot_id: String,
    /// The car occupying it.
    pub car_id: String,
    /// When the occupancy began.
    pub since: Timestamp,
}

/// State of a lot as of `time`.
///
/// Maps are ordered so two states built from the same events compare equal
/// and serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotState {
    /// The lot (stream) this state describes.
    pub lot_id: String,
    /// Business time of the last applied event, or the stamp the empty
    /// state was created with.
    pub time: Timestamp,
    /// Cars currently inside, by id.
    pub cars: BTreeMap<String, CarState>,
    /// Occupied spots, by id. Free spots are absent.
    pub spots: BTreeMap<String, SpotOccupancy>,
}

impl LotState {
    /// An empty lot stamped with `time`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lotfold::{LotState, Timestamp};
    ///
    /// let state = LotState::empty("001", Timestamp::from_millis(0).unwrap());
    /// assert!(state.is_empty());
    /// assert_eq!(state.lot_id, "001");
    /// ```
    pub fn empty(lot_id: impl Into<String>, time: Timestamp) -> Self {
        LotState {
            lot_id: lot_id.into(),
            time,
            cars: BTreeMap::new(),
            spots: BTreeMap::new(),
        }
    }

    /// `true` if no car is inside and no spot is occupied.
    pub fn is_empty(&self) -> bool {
        self.cars.is_empty() && self.spots.is_empty()
    }

    /// Look up a car by id.
    pub fn car(&self, car_id: &str) -> Option<&CarState> {
        self.cars.get(car_id)
    }

    /// The id of the car occupying `spot_id`, if any.
    pub fn occupant(&self, spot_id: &str) -> Option<&str> {
        self.spots.get(spot_id).map(|spot| spot.car_id.as_str())
    }
}
