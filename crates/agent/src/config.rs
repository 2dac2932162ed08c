//! Agent Configuration
//!
//! Loaded from the process environment through the `config` crate, then
//! validated into [`Settings`]. Nothing is acquired before validation passes.

use recorder::{ConnectionError, Credentials};
use sampling_loop::LoopConfig;
use sensor_source::HardwareConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default PIR settle time before the first tick
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;

/// Configuration errors; always fatal before start
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Raw environment values, keys lowercased by the `config` crate
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_key: Option<String>,
    database_url: Option<String>,
    db_name: Option<String>,
    sample_interval_ms: Option<u64>,
    io_timeout_ms: Option<u64>,
    settle_delay_ms: Option<u64>,
    sensor_mode: Option<String>,
    w1_devices_dir: Option<PathBuf>,
    w1_device_id: Option<String>,
    pir_pin: Option<u32>,
    gpio_root: Option<PathBuf>,
}

/// Which sensors to drive
#[derive(Debug, Clone)]
pub enum SensorMode {
    Hardware(HardwareConfig),
    Simulated,
}

/// Validated agent settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub loop_config: LoopConfig,
    pub settle_delay: Duration,
    pub sensors: SensorMode,
}

impl Settings {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config::Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(config::Environment::default().source(Some(vars)))
    }

    fn load(source: config::Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let api_key = required("API_KEY", raw.api_key)?;
        let database_url = required("DATABASE_URL", raw.database_url)?;
        let db_name = required("DB_NAME", raw.db_name)?;
        let credentials = Credentials::new(database_url, db_name, api_key).map_err(|e| match e {
            ConnectionError::MissingCredential(field) => ConfigError::Missing(field),
            other => ConfigError::Invalid {
                field: "DATABASE_URL",
                reason: other.to_string(),
            },
        })?;

        let interval_ms = raw.sample_interval_ms.unwrap_or(1_000);
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "SAMPLE_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        let mut loop_config = LoopConfig::with_interval(Duration::from_millis(interval_ms));
        if let Some(timeout_ms) = raw.io_timeout_ms {
            if timeout_ms == 0 || timeout_ms > interval_ms {
                return Err(ConfigError::Invalid {
                    field: "IO_TIMEOUT_MS",
                    reason: format!("must be between 1 and the sample interval ({interval_ms}ms)"),
                });
            }
            loop_config.io_timeout = Duration::from_millis(timeout_ms);
        }

        let sensors = match raw.sensor_mode.as_deref().map(str::trim) {
            None | Some("") | Some("hardware") => {
                let defaults = HardwareConfig::default();
                SensorMode::Hardware(HardwareConfig {
                    w1_devices_dir: raw.w1_devices_dir.unwrap_or(defaults.w1_devices_dir),
                    w1_device_id: raw.w1_device_id.filter(|id| !id.trim().is_empty()),
                    pir_pin: raw.pir_pin.unwrap_or(defaults.pir_pin),
                    gpio_root: raw.gpio_root.unwrap_or(defaults.gpio_root),
                })
            }
            Some("simulated") => SensorMode::Simulated,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    field: "SENSOR_MODE",
                    reason: format!("expected 'hardware' or 'simulated', got {other:?}"),
                });
            }
        };

        Ok(Self {
            credentials,
            loop_config,
            settle_delay: Duration::from_millis(raw.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS)),
            sensors,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}
