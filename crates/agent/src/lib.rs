//! Edge Sensor Agent
//!
//! Samples a temperature probe and a motion detector once per cadence and
//! records each reading into the configured database until interrupted.

mod config;
mod lifecycle;
mod logging;

pub use config::{ConfigError, SensorMode, Settings, DEFAULT_SETTLE_DELAY_MS};
pub use lifecycle::{acquire_within, open_recorder, spawn_signal_listener, Agent, AgentError, Sensors};
pub use logging::init_logging;
