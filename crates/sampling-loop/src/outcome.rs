//! Loop State and Tick Outcomes

use std::fmt;

/// Phase of the sampling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Created, no tick yet
    Idle,
    /// Reading sensors, or waiting for the next cadence boundary
    Sampling,
    /// Writing the tick's reading
    Persisting,
    /// Terminal; reached only through the shutdown signal
    Stopped,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Both rows written
    Persisted {
        /// Whether the tick needed its reconnection to succeed
        reconnected: bool,
    },
    /// Sensor read failed; nothing written
    SensorFailed,
    /// Write failed and the rest of the tick's data was dropped
    Dropped {
        /// Whether the temperature row is known to have been written. A
        /// timed-out temperature insert reports `false` even though it may
        /// have committed late.
        persisted_temperature: bool,
        /// Whether a reconnection succeeded during the tick
        reconnected: bool,
    },
}

/// Running counters over the loop's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub persisted: u64,
    pub sensor_failures: u64,
    pub dropped: u64,
    pub reconnect_attempts: u64,
}

impl LoopStats {
    pub(crate) fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Persisted { .. } => self.persisted += 1,
            TickOutcome::SensorFailed => self.sensor_failures += 1,
            TickOutcome::Dropped { .. } => self.dropped += 1,
        }
    }
}

impl fmt::Display for LoopStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks, {} persisted, {} sensor failures, {} dropped, {} reconnect attempts",
            self.ticks, self.persisted, self.sensor_failures, self.dropped, self.reconnect_attempts
        )
    }
}
