//! Loop Configuration

use std::time::Duration;

/// Upper bound on timed I/O calls within one tick: the sensor read, the
/// two inserts, one reconnection and one retried insert
pub const MAX_IO_CALLS_PER_TICK: u32 = 5;

/// Configuration for the sampling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Cadence between ticks (default: 1s)
    pub interval: Duration,
    /// Bound on each sensor read, connect and insert (default: half the interval)
    pub io_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }
}

impl LoopConfig {
    /// Config with the given cadence and the default I/O timeout for it
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            io_timeout: interval / 2,
        }
    }

    /// Lock wait for the store's driver, so a blocked insert fails on its
    /// own before `io_timeout` abandons it
    pub fn busy_timeout(&self) -> Duration {
        self.io_timeout / 2
    }

    /// Longest a single tick can take once started
    pub fn max_tick_duration(&self) -> Duration {
        self.io_timeout * MAX_IO_CALLS_PER_TICK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoopConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.io_timeout, Duration::from_millis(500));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_max_tick_duration() {
        let config = LoopConfig {
            interval: Duration::from_secs(2),
            io_timeout: Duration::from_millis(300),
        };
        assert_eq!(config.max_tick_duration(), Duration::from_millis(1500));
    }
}
