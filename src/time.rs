//! Millisecond-resolution UTC timestamps with a sortable textual form.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// An instant on the event timeline.
///
/// Held in UTC and truncated to whole milliseconds, so the textual form
/// round-trips exactly. It always renders with three fractional digits and a
/// `Z` suffix, which makes lexical order agree with time order:
///
/// ```
/// use lotfold::Timestamp;
///
/// let ts = Timestamp::parse("2024-05-01T10:00:00.5+02:00").unwrap();
/// assert_eq!(ts.to_string(), "2024-05-01T08:00:00.500Z");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap a `chrono` instant, dropping sub-millisecond precision.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        // Truncation to one millisecond cannot exceed chrono's range.
        let truncated = datetime
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(datetime);
        Timestamp(truncated)
    }

    /// Build a timestamp from milliseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside the representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Timestamp)
    }

    /// Parse an RFC 3339 timestamp with any UTC offset.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if `input` is not a
    /// valid RFC 3339 timestamp.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(input.trim())
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::InvalidTimestamp {
                value: input.to_string(),
                reason: e.to_string(),
            })
    }

    /// The underlying `chrono` instant.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Signed milliseconds from `self` to `later`. Negative when `later` is
    /// actually earlier.
    pub fn millis_until(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0).num_milliseconds()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::from_datetime(datetime)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}
