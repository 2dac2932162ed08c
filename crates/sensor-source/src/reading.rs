//! Reading and Timestamp Types

use chrono::{NaiveDateTime, Timelike};
use std::fmt;

/// One raw sample from both sensors, before it is stamped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Temperature in degrees Celsius
    pub temperature_celsius: f64,
    /// Motion detector state
    pub motion_detected: bool,
}

/// ISO-8601 local wall-clock time as stored in the `timestamp` column
///
/// Sub-second precision is microseconds and is omitted entirely when zero,
/// so `2024-01-01T00:00:00` and `2024-01-01T00:00:00.250000` are both valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(String);

impl Timestamp {
    /// Format a local naive date-time
    pub fn from_naive(at: NaiveDateTime) -> Self {
        let base = at.format("%Y-%m-%dT%H:%M:%S");
        // Leap seconds carry nanoseconds >= 1e9
        let micros = (at.nanosecond() / 1_000) % 1_000_000;
        if micros == 0 {
            Self(base.to_string())
        } else {
            Self(format!("{base}.{micros:06}"))
        }
    }

    /// Current local time
    pub fn now() -> Self {
        Self::from_naive(chrono::Local::now().naive_local())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stamped pair of sensor values captured within one tick
///
/// Both rows written for a reading share its timestamp. Readings are never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    timestamp: Timestamp,
    temperature_celsius: f64,
    motion_detected: bool,
}

impl Reading {
    /// Stamp a sample with the time of its tick
    pub fn stamp(sample: SensorSample, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            temperature_celsius: sample.temperature_celsius,
            motion_detected: sample.motion_detected,
        }
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius
    }

    pub fn motion_detected(&self) -> bool {
        self.motion_detected
    }
}
