//! Sensor Source Implementations

use crate::error::SensorReadError;
use crate::motion::{GpioMotion, DEFAULT_GPIO_ROOT, DEFAULT_PIR_PIN};
use crate::reading::SensorSample;
use crate::thermometer::{W1Thermometer, DEFAULT_W1_DEVICES_DIR};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Capability producing one temperature and one motion sample on demand
///
/// Implementations never retry internally; a failed read is returned to the
/// caller, which decides whether and when to try again.
#[async_trait]
pub trait SensorSource: Send {
    /// Read both sensors once
    async fn sample(&mut self) -> Result<SensorSample, SensorReadError>;

    /// Release hardware handles. Safe to call more than once.
    async fn release(&mut self);
}

/// Hardware locations of the probe and the motion detector
#[derive(Debug, Clone)]
pub struct HardwareConfig {
    /// sysfs directory listing 1-Wire devices
    pub w1_devices_dir: PathBuf,
    /// Specific probe id; auto-discovered when `None`
    pub w1_device_id: Option<String>,
    /// BCM pin of the PIR output
    pub pir_pin: u32,
    /// sysfs GPIO root
    pub gpio_root: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            w1_devices_dir: PathBuf::from(DEFAULT_W1_DEVICES_DIR),
            w1_device_id: None,
            pir_pin: DEFAULT_PIR_PIN,
            gpio_root: PathBuf::from(DEFAULT_GPIO_ROOT),
        }
    }
}

/// 1-Wire thermometer plus PIR detector on a GPIO line
pub struct HardwareSensors {
    thermometer: W1Thermometer,
    motion: GpioMotion,
}

impl HardwareSensors {
    /// Acquire both sensor handles
    pub async fn acquire(config: &HardwareConfig) -> Result<Self, SensorReadError> {
        let thermometer =
            W1Thermometer::discover(&config.w1_devices_dir, config.w1_device_id.as_deref()).await?;
        let motion = GpioMotion::open(&config.gpio_root, config.pir_pin).await?;

        info!(
            "Sensors acquired: thermometer {}, motion on GPIO {}",
            thermometer.device_id(),
            motion.pin()
        );
        Ok(Self {
            thermometer,
            motion,
        })
    }
}

#[async_trait]
impl SensorSource for HardwareSensors {
    async fn sample(&mut self) -> Result<SensorSample, SensorReadError> {
        let temperature_celsius = self.thermometer.read_celsius().await?;
        let motion_detected = self.motion.read().await?;
        Ok(SensorSample {
            temperature_celsius,
            motion_detected,
        })
    }

    async fn release(&mut self) {
        self.motion.release().await;
    }
}

/// Simulated sensors for running without hardware
///
/// Values are pseudo-random but deterministic for a given seed.
pub struct SimulatedSensors {
    state: u64,
    released: bool,
}

impl SimulatedSensors {
    pub fn new(seed: u64) -> Self {
        info!("Creating simulated sensors (seed {})", seed);
        Self {
            // xorshift state must be non-zero
            state: seed.max(1),
            released: false,
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

#[async_trait]
impl SensorSource for SimulatedSensors {
    async fn sample(&mut self) -> Result<SensorSample, SensorReadError> {
        if self.released {
            return Err(SensorReadError::Released);
        }

        // 18.000-25.999 °C in probe resolution steps
        let temperature_celsius = 18.0 + (self.next() % 8_000) as f64 / 1000.0;
        // Roughly one tick in four sees motion
        let motion_detected = self.next() % 4 == 0;

        debug!(
            "Simulated sample: {:.3} °C, motion {}",
            temperature_celsius, motion_detected
        );
        Ok(SensorSample {
            temperature_celsius,
            motion_detected,
        })
    }

    async fn release(&mut self) {
        self.released = true;
    }
}
