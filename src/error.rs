//! Crate-level error types for event validation and replay scheduling.

use crate::event::EventKind;

/// Error returned when an event is rejected before it reaches the log.
///
/// A rejected append writes nothing: the log, and any projection fed from
/// it, is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The record handed to the decoder was not a JSON object.
    #[error("event record must be a JSON object")]
    NotARecord,

    /// The record carries no `type` discriminator.
    #[error("event record is missing its `type`")]
    MissingType,

    /// The `type` discriminator names no known event kind.
    #[error("unknown event type `{kind}`")]
    UnknownKind {
        /// The unrecognised discriminator, verbatim.
        kind: String,
    },

    /// A field required by the event kind is absent, null, or blank.
    #[error("{kind}: missing required field `{field}`")]
    MissingField {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// A field is present but its value is unusable (e.g. a non-finite
    /// coordinate).
    #[error("{kind}: malformed field `{field}`: {reason}")]
    Malformed {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Wire name of the malformed field.
        field: &'static str,
        /// What is wrong with the value.
        reason: String,
    },

    /// A timestamp could not be parsed as RFC 3339.
    #[error("invalid timestamp `{value}`: {reason}")]
    InvalidTimestamp {
        /// The rejected input, verbatim.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The record matched its kind's field table but still failed to decode
    /// (wrong JSON types, negative durations, and so on).
    #[error("{kind}: {reason}")]
    Decode {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The event names a different lot than the stream it is appended to.
    #[error("event for lot `{lot_id}` cannot be appended to stream `{stream_id}`")]
    StreamMismatch {
        /// Stream the caller tried to append to.
        stream_id: String,
        /// Lot named by the event itself.
        lot_id: String,
    },
}

/// Error returned when a replay cannot be started or did not run to a
/// normal end.
///
/// An aborted replay is not an error; see
/// [`ReplayOutcome::Aborted`](crate::ReplayOutcome::Aborted).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    /// Speed multiplier is zero, negative, or not finite.
    #[error("replay speed must be a positive finite number, got {speed}")]
    InvalidSpeed {
        /// The rejected multiplier.
        speed: f64,
    },

    /// Abort polling interval is zero.
    #[error("replay poll interval must be greater than zero")]
    InvalidPollInterval,

    /// The spawned replay task panicked or was cancelled by the runtime.
    #[error("replay task failed: {0}")]
    TaskFailed(String),
}
