//! Timestamps as emitted by the API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TimeError;

/// A UTC timestamp decoded from any of the formats the API uses.
///
/// Depending on the `X-Accept-Datetime-Format` header and the endpoint, the API
/// sends one of:
/// - an integer number of seconds since the UNIX epoch,
/// - a string of digits holding microseconds since the epoch (`UNIX` format),
/// - an RFC 3339 string (`RFC3339` format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Time {
    /// Wraps a UTC datetime.
    #[must_use]
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the wrapped datetime.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Builds a timestamp from whole seconds since the UNIX epoch.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is out of chrono's range.
    pub fn from_unix_seconds(secs: i64) -> Result<Self, TimeError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| TimeError::OutOfRange(secs.to_string()))
    }

    /// Builds a timestamp from microseconds since the UNIX epoch.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is out of chrono's range.
    pub fn from_unix_micros(micros: i64) -> Result<Self, TimeError> {
        DateTime::from_timestamp_micros(micros)
            .map(Self)
            .ok_or_else(|| TimeError::OutOfRange(micros.to_string()))
    }

    fn from_unix_float(secs: f64) -> Result<Self, TimeError> {
        if !secs.is_finite() {
            return Err(TimeError::OutOfRange(secs.to_string()));
        }
        let whole = secs.trunc();
        let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
            .map(Self)
            .ok_or_else(|| TimeError::OutOfRange(secs.to_string()))
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

impl From<Time> for DateTime<Utc> {
    fn from(time: Time) -> Self {
        time.0
    }
}

impl FromStr for Time {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            let micros: i64 = s
                .parse()
                .map_err(|_| TimeError::OutOfRange(s.to_string()))?;
            return Self::from_unix_micros(micros);
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| TimeError::Invalid(s.to_string()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TimeVisitor;

impl Visitor<'_> for TimeVisitor {
    type Value = Time;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UNIX seconds, a UNIX microseconds string or an RFC 3339 string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Time, E> {
        Time::from_unix_seconds(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Time, E> {
        let secs = i64::try_from(v).map_err(E::custom)?;
        self.visit_i64(secs)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Time, E> {
        Time::from_unix_float(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Time, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimeVisitor)
    }
}
