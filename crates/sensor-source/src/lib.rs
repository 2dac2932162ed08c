//! Sensor Sampling
//!
//! Capability layer over the two local sensors of the telemetry agent: a
//! 1-Wire temperature probe and a PIR motion detector on a GPIO input.
//! Includes a simulated source for running without hardware.

mod error;
mod motion;
mod reading;
mod source;
mod thermometer;

pub use error::SensorReadError;
pub use motion::{parse_gpio_value, GpioMotion, DEFAULT_GPIO_ROOT, DEFAULT_PIR_PIN};
pub use reading::{Reading, SensorSample, Timestamp};
pub use source::{HardwareConfig, HardwareSensors, SensorSource, SimulatedSensors};
pub use thermometer::{parse_w1_slave, W1Thermometer, DEFAULT_W1_DEVICES_DIR};
