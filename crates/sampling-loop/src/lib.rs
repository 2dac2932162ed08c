//! Sampling Loop
//!
//! Drives the agent: on a fixed cadence it samples the sensors, stamps the
//! reading and hands it to the recorder. Per-tick failures are logged and
//! absorbed; only the shutdown signal ends the loop.

mod clock;
mod config;
mod outcome;
mod sampler;

pub use clock::{Clock, LocalClock};
pub use config::{LoopConfig, MAX_IO_CALLS_PER_TICK};
pub use outcome::{LoopPhase, LoopStats, TickOutcome};
pub use sampler::SamplingLoop;
