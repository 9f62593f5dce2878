use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::time::Timestamp;

/// A point on the lot's 2D plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Discriminator for [`DomainEvent`] variants.
///
/// Mirrors the `"type"` tag used on the wire and carries the table of
/// fields each kind requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`DomainEvent::CarEntered`].
    CarEntered,
    /// See [`DomainEvent::CarMoved`].
    CarMoved,
    /// See [`DomainEvent::CarExited`].
    CarExited,
    /// See [`DomainEvent::SpotOccupied`].
    SpotOccupied,
    /// See [`DomainEvent::SpotVacated`].
    SpotVacated,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::CarEntered,
        EventKind::CarMoved,
        EventKind::CarExited,
        EventKind::SpotOccupied,
        EventKind::SpotVacated,
    ];

    /// The wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::CarEntered => "CarEntered",
            EventKind::CarMoved => "CarMoved",
            EventKind::CarExited => "CarExited",
            EventKind::SpotOccupied => "SpotOccupied",
            EventKind::SpotVacated => "SpotVacated",
        }
    }

    /// Wire names of the fields a record of this kind must carry.
    ///
    /// `durationMs` on [`CarMoved`](EventKind::CarMoved) is optional and not
    /// listed.
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            EventKind::CarEntered => &["lotId", "carId", "pos", "occurredAt"],
            EventKind::CarMoved => &["lotId", "carId", "from", "to", "occurredAt"],
            EventKind::CarExited => &["lotId", "carId", "occurredAt"],
            EventKind::SpotOccupied | EventKind::SpotVacated => {
                &["lotId", "carId", "spotId", "occurredAt"]
            }
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKind {
                kind: s.to_string(),
            })
    }
}

/// Something that happened in a lot.
///
/// Serialized with a `"type"` tag and camelCase fields, e.g.
/// `{"type":"CarEntered","lotId":"001","carId":"A","pos":{"x":1.0,"y":2.0},"occurredAt":"..."}`.
/// The set of variants is closed: [`fold`](crate::fold) and
/// [`validate`](DomainEvent::validate) match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A car drove in at `pos`.
    #[serde(rename_all = "camelCase")]
    CarEntered {
        /// Lot (stream) the event belongs to.
        lot_id: String,
        /// The car.
        car_id: String,
        /// Where the car appeared.
        pos: Position,
        /// Business time of the event.
        occurred_at: Timestamp,
    },

    /// A car moved from `from` to `to`, optionally animated over
    /// `duration_ms`.
    #[serde(rename_all = "camelCase")]
    CarMoved {
        /// Lot (stream) the event belongs to.
        lot_id: String,
        /// The car.
        car_id: String,
        /// Position before the move.
        from: Position,
        /// Position after the move.
        to: Position,
        /// Business time of the event.
        occurred_at: Timestamp,
        /// Animation hint for renderers; ignored by the fold.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    /// A car left the lot.
    #[serde(rename_all = "camelCase")]
    CarExited {
        /// Lot (stream) the event belongs to.
        lot_id: String,
        /// The car.
        car_id: String,
        /// Business time of the event.
        occurred_at: Timestamp,
    },

    /// A car took a parking spot.
    #[serde(rename_all = "camelCase")]
    SpotOccupied {
        /// Lot (stream) the event belongs to.
        lot_id: String,
        /// The car.
        car_id: String,
        /// The spot.
        spot_id: String,
        /// Business time of the event.
        occurred_at: Timestamp,
    },

    /// A car released a parking spot.
    #[serde(rename_all = "camelCase")]
    SpotVacated {
        /// Lot (stream) the event belongs to.
        lot_id: String,
        /// The car.
        car_id: String,
        /// The spot.
        spot_id: String,
        /// Business time of the event.
        occurred_at: Timestamp,
    },
}

impl DomainEvent {
    /// Build a [`DomainEvent::CarEntered`].
    pub fn car_entered(
        lot_id: impl Into<String>,
        car_id: impl Into<String>,
        pos: Position,
        occurred_at: Timestamp,
    ) -> Self {
        DomainEvent::CarEntered {
            lot_id: lot_id.into(),
            car_id: car_id.into(),
            pos,
            occurred_at,
        }
    }

    /// Build a [`DomainEvent::CarMoved`] without a duration hint.
    pub fn car_moved(
        lot_id: impl Into<String>,
        car_id: impl Into<String>,
        from: Position,
        to: Position,
        occurred_at: Timestamp,
    ) -> Self {
        DomainEvent::CarMoved {
            lot_id: lot_id.into(),
            car_id: car_id.into(),
            from,
            to,
            occurred_at,
            duration_ms: None,
        }
    }

    /// Build a [`DomainEvent::CarExited`].
    pub fn car_exited(
        lot_id: impl Into<String>,
        car_id: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        DomainEvent::CarExited {
            lot_id: lot_id.into(),
            car_id: car_id.into(),
            occurred_at,
        }
    }

    /// Build a [`DomainEvent::SpotOccupied`].
    pub fn spot_occupied(
        lot_id: impl Into<String>,
        car_id: impl Into<String>,
        spot_id: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        DomainEvent::SpotOccupied {
            lot_id: lot_id.into(),
            car_id: car_id.into(),
            spot_id: spot_id.into(),
            occurred_at,
        }
    }

    /// Build a [`DomainEvent::SpotVacated`].
    pub fn spot_vacated(
        lot_id: impl Into<String>,
        car_id: impl Into<String>,
        spot_id: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        DomainEvent::SpotVacated {
            lot_id: lot_id.into(),
            car_id: car_id.into(),
            spot_id: spot_id.into(),
            occurred_at,
        }
    }

    /// The kind of this event.
    pub const fn kind(&self) -> EventKind {
        match self {
            DomainEvent::CarEntered { .. } => EventKind::CarEntered,
            DomainEvent::CarMoved { .. } => EventKind::CarMoved,
            DomainEvent::CarExited { .. } => EventKind::CarExited,
            DomainEvent::SpotOccupied { .. } => EventKind::SpotOccupied,
            DomainEvent::SpotVacated { .. } => EventKind::SpotVacated,
        }
    }

    /// The lot this event belongs to.
    pub fn lot_id(&self) -> &str {
        match self {
            DomainEvent::CarEntered { lot_id, .. }
            | DomainEvent::CarMoved { lot_id, .. }
            | DomainEvent::CarExited { lot_id, .. }
            | DomainEvent::SpotOccupied { lot_id, .. }
            | DomainEvent::SpotVacated { lot_id, .. } => lot_id,
        }
    }

    /// The car this event is about.
    pub fn car_id(&self) -> &str {
        match self {
            DomainEvent::CarEntered { car_id, .. }
            | DomainEvent::CarMoved { car_id, .. }
            | DomainEvent::CarExited { car_id, .. }
            | DomainEvent::SpotOccupied { car_id, .. }
            | DomainEvent::SpotVacated { car_id, .. } => car_id,
        }
    }

    /// The spot this event is about, for spot events.
    pub fn spot_id(&self) -> Option<&str> {
        match self {
            DomainEvent::SpotOccupied { spot_id, .. } | DomainEvent::SpotVacated { spot_id, .. } => {
                Some(spot_id)
            }
            DomainEvent::CarEntered { .. }
            | DomainEvent::CarMoved { .. }
            | DomainEvent::CarExited { .. } => None,
        }
    }

    /// Business time of the event.
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            DomainEvent::CarEntered { occurred_at, .. }
            | DomainEvent::CarMoved { occurred_at, .. }
            | DomainEvent::CarExited { occurred_at, .. }
            | DomainEvent::SpotOccupied { occurred_at, .. }
            | DomainEvent::SpotVacated { occurred_at, .. } => *occurred_at,
        }
    }

    /// Check the fields the type system cannot: identifiers must not be
    /// blank and coordinates must be finite.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for a blank identifier and
    /// [`ValidationError::Malformed`] for a non-finite coordinate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        require(kind, "lotId", self.lot_id())?;
        require(kind, "carId", self.car_id())?;
        match self {
            DomainEvent::CarEntered { pos, .. } => finite(kind, "pos", pos),
            DomainEvent::CarMoved { from, to, .. } => {
                finite(kind, "from", from)?;
                finite(kind, "to", to)
            }
            DomainEvent::CarExited { .. } => Ok(()),
            DomainEvent::SpotOccupied { spot_id, .. } | DomainEvent::SpotVacated { spot_id, .. } => {
                require(kind, "spotId", spot_id)
            }
        }
    }

    /// Decode a loosely typed JSON record into an event.
    ///
    /// Checks the record against its kind's field table before decoding, so
    /// a missing field is reported by name. A record without `occurredAt` is
    /// stamped with `ingested_at`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first problem found:
    /// not an object, no or unknown `type`, a missing required field, an
    /// unparseable `occurredAt`, a field of the wrong JSON type, or a value
    /// rejected by [`validate`](DomainEvent::validate).
    ///
    /// # Examples
    ///
    /// ```
    /// use lotfold::{DomainEvent, Timestamp};
    /// use serde_json::json;
    ///
    /// let now = Timestamp::parse("2024-05-01T08:00:00Z").unwrap();
    /// let event = DomainEvent::from_json(
    ///     json!({"type": "CarExited", "lotId": "001", "carId": "A"}),
    ///     now,
    /// )
    /// .unwrap();
    /// assert_eq!(event.occurred_at(), now);
    /// ```
    pub fn from_json(value: Value, ingested_at: Timestamp) -> Result<Self, ValidationError> {
        let Value::Object(mut record) = value else {
            return Err(ValidationError::NotARecord);
        };

        let kind: EventKind = match record.get("type") {
            Some(Value::String(name)) => name.parse()?,
            Some(Value::Null) | None => return Err(ValidationError::MissingType),
            Some(other) => {
                return Err(ValidationError::UnknownKind {
                    kind: other.to_string(),
                });
            }
        };

        for &field in kind.required_fields() {
            if field == "occurredAt" {
                continue;
            }
            if record.get(field).is_none_or(Value::is_null) {
                return Err(ValidationError::MissingField { kind, field });
            }
        }

        let occurred_at = match record.get("occurredAt") {
            None | Some(Value::Null) => ingested_at,
            Some(Value::String(raw)) => Timestamp::parse(raw)?,
            Some(other) => {
                return Err(ValidationError::Malformed {
                    kind,
                    field: "occurredAt",
                    reason: format!("expected a timestamp string, got {other}"),
                });
            }
        };
        record.insert(
            "occurredAt".to_string(),
            Value::String(occurred_at.to_string()),
        );

        let event: DomainEvent =
            serde_json::from_value(Value::Object(record)).map_err(|e| ValidationError::Decode {
                kind,
                reason: e.to_string(),
            })?;
        event.validate()?;
        Ok(event)
    }
}

fn require(kind: EventKind, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { kind, field });
    }
    Ok(())
}

fn finite(kind: EventKind, field: &'static str, pos: &Position) -> Result<(), ValidationError> {
    if !pos.is_finite() {
        return Err(ValidationError::Malformed {
            kind,
            field,
            reason: format!("coordinates must be finite, got ({}, {})", pos.x, pos.y),
        });
    }
    Ok(())
}

/// An event as recorded in the log.
///
/// The envelope is created once by [`EventLog::append`](crate::EventLog::append)
/// and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Globally unique identifier assigned at append.
    pub event_id: Uuid,

    /// Stream (lot) the event was appended to.
    pub stream_id: String,

    /// Business time, copied from the event. The log's sort key.
    pub occurred_at: Timestamp,

    /// Wall-clock time of ingestion.
    pub created_at: Timestamp,

    /// The domain payload.
    pub event: DomainEvent,
}
