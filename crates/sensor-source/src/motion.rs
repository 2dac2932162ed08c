//! PIR Motion Detector on a GPIO Input
//!
//! Uses the Linux sysfs GPIO interface (`/sys/class/gpio`).

use crate::error::SensorReadError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default sysfs GPIO root
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Default BCM pin the PIR output is wired to
pub const DEFAULT_PIR_PIN: u32 = 23;

/// udev may need a moment to apply permissions after export
const EXPORT_ATTEMPTS: u32 = 10;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Digital input connected to a PIR motion detector
#[derive(Debug)]
pub struct GpioMotion {
    /// BCM pin number
    pin: u32,
    /// sysfs root
    root: PathBuf,
    /// Whether this handle exported the pin and must unexport it
    exported: bool,
    /// Whether the handle has been released
    released: bool,
}

impl GpioMotion {
    /// Export `pin` (if needed) and configure it as an input
    pub async fn open(root: &Path, pin: u32) -> Result<Self, SensorReadError> {
        let pin_dir = root.join(format!("gpio{pin}"));
        let mut exported = false;

        if tokio::fs::metadata(&pin_dir).await.is_err() {
            tokio::fs::write(root.join("export"), pin.to_string())
                .await
                .map_err(|e| gpio_error(pin, format!("export failed: {e}")))?;
            exported = true;
        }

        let direction = pin_dir.join("direction");
        let mut attempt = 0;
        loop {
            attempt += 1;
            match tokio::fs::write(&direction, "in").await {
                Ok(()) => break,
                Err(e) if attempt < EXPORT_ATTEMPTS => {
                    debug!("GPIO {} direction not writable yet (attempt {}): {}", pin, attempt, e);
                    tokio::time::sleep(EXPORT_RETRY_DELAY).await;
                }
                Err(e) => {
                    if exported {
                        unexport(root, pin).await;
                    }
                    return Err(gpio_error(pin, format!("set direction failed: {e}")));
                }
            }
        }

        info!("Motion detector configured on GPIO {}", pin);
        Ok(Self {
            pin,
            root: root.to_path_buf(),
            exported,
            released: false,
        })
    }

    /// BCM pin number
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Read the current input level
    pub async fn read(&self) -> Result<bool, SensorReadError> {
        if self.released {
            return Err(SensorReadError::Released);
        }
        let path = self.root.join(format!("gpio{}", self.pin)).join("value");
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| gpio_error(self.pin, format!("read failed: {e}")))?;
        parse_gpio_value(self.pin, &raw)
    }

    /// Unexport the pin if this handle exported it. Idempotent.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.exported && !unexport(&self.root, self.pin).await {
            return;
        }
        info!("Released GPIO {}", self.pin);
    }
}

async fn unexport(root: &Path, pin: u32) -> bool {
    match tokio::fs::write(root.join("unexport"), pin.to_string()).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to unexport GPIO {}: {}", pin, e);
            false
        }
    }
}

/// Parse a sysfs `value` file (`0` or `1`)
pub fn parse_gpio_value(pin: u32, raw: &str) -> Result<bool, SensorReadError> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(gpio_error(pin, format!("unexpected value {other:?}"))),
    }
}

fn gpio_error(pin: u32, reason: String) -> SensorReadError {
    SensorReadError::Gpio { pin, reason }
}
