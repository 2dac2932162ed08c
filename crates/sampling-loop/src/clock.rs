//! Wall Clock Source

use sensor_source::Timestamp;

/// Source of reading timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
