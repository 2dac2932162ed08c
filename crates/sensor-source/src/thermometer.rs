//! 1-Wire Temperature Probe
//!
//! Reads DS18B20-family probes through the kernel `w1_therm` driver, which
//! exposes each device as `<devices_dir>/<family>-<serial>/w1_slave`.

use crate::error::SensorReadError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default sysfs directory for 1-Wire devices
pub const DEFAULT_W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// Family code prefixes of supported thermometers (DS18S20, DS1822, DS18B20, DS1825, DS28EA00)
const THERMOMETER_FAMILIES: [&str; 5] = ["10-", "22-", "28-", "3b-", "42-"];

/// Raw reading (millidegrees) a probe reports before its first conversion
const POWER_ON_RESET_MILLIDEGREES: i64 = 85_000;

/// 1-Wire thermometer handle
#[derive(Debug, Clone)]
pub struct W1Thermometer {
    /// Device id, e.g. "28-00000a1b2c3d"
    device_id: String,
    /// Path to the device's w1_slave file
    slave_path: PathBuf,
}

impl W1Thermometer {
    /// Locate a thermometer under `devices_dir`
    ///
    /// When `device_id` is `None` the first device with a thermometer family
    /// prefix is used, in lexical order so the choice is stable across runs.
    pub async fn discover(
        devices_dir: &Path,
        device_id: Option<&str>,
    ) -> Result<Self, SensorReadError> {
        let device_id = match device_id {
            Some(id) => id.to_string(),
            None => {
                let mut candidates = Vec::new();
                let mut entries = tokio::fs::read_dir(devices_dir)
                    .await
                    .map_err(|_| SensorReadError::NoSensorFound(devices_dir.to_path_buf()))?;
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if THERMOMETER_FAMILIES.iter().any(|p| name.starts_with(p)) {
                        candidates.push(name);
                    }
                }
                candidates.sort();
                candidates
                    .into_iter()
                    .next()
                    .ok_or_else(|| SensorReadError::NoSensorFound(devices_dir.to_path_buf()))?
            }
        };

        let slave_path = devices_dir.join(&device_id).join("w1_slave");
        if tokio::fs::metadata(&slave_path).await.is_err() {
            return Err(SensorReadError::NoSensorFound(devices_dir.join(&device_id)));
        }

        info!("Using temperature sensor {}", device_id);
        Ok(Self {
            device_id,
            slave_path,
        })
    }

    /// Device id of this probe
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Trigger a conversion and return the temperature in Celsius
    pub async fn read_celsius(&self) -> Result<f64, SensorReadError> {
        let raw = tokio::fs::read_to_string(&self.slave_path).await?;
        let celsius = parse_w1_slave(&self.device_id, &raw)?;
        debug!("Temperature {}: {:.3} °C", self.device_id, celsius);
        Ok(celsius)
    }
}

/// Parse the two-line `w1_slave` payload
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(device_id: &str, raw: &str) -> Result<f64, SensorReadError> {
    let mut lines = raw.lines();
    let status = lines
        .next()
        .ok_or_else(|| SensorReadError::InvalidPayload("empty w1_slave".to_string()))?;
    if !status.trim_end().ends_with("YES") {
        return Err(SensorReadError::CrcMismatch(device_id.to_string()));
    }

    let data = lines
        .next()
        .ok_or_else(|| SensorReadError::InvalidPayload("missing data line".to_string()))?;
    let value = data
        .rsplit_once("t=")
        .map(|(_, v)| v.trim())
        .ok_or_else(|| SensorReadError::InvalidPayload(format!("no t= field in {data:?}")))?;
    let millidegrees: i64 = value
        .parse()
        .map_err(|_| SensorReadError::InvalidPayload(format!("bad temperature {value:?}")))?;

    if millidegrees == POWER_ON_RESET_MILLIDEGREES {
        return Err(SensorReadError::PowerOnReset(device_id.to_string()));
    }

    Ok(millidegrees as f64 / 1000.0)
}
