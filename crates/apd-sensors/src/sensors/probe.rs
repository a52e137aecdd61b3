//! Shared temperature and humidity probe.
//!
//! DHT11/DHT22/AM2302 probes are exposed by the kernel `dht11` IIO driver
//! under `/sys/bus/iio/devices`. One physical probe serves both climate
//! sensors, so they share a single lazily opened handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{Result, SensorError};

/// IIO device names accepted during auto-detection.
const DRIVER_PREFIX: &str = "dht";

const TEMPERATURE_ATTRIBUTE: &str = "in_temp_input";
const HUMIDITY_ATTRIBUTE: &str = "in_humidityrelative_input";

/// An opened IIO climate probe.
#[derive(Debug)]
pub struct IioProbe {
    device_dir: PathBuf,
}

impl IioProbe {
    /// Opens a probe by IIO device name (e.g. `iio:device0`), or the first
    /// DHT device found when `device` is `None`.
    pub fn open(sys_root: &Path, device: Option<&str>) -> Result<Self> {
        let devices_dir = sys_root.join("bus/iio/devices");

        let device_dir = match device {
            Some(device) => {
                let dir = devices_dir.join(device);
                if !dir.join(TEMPERATURE_ATTRIBUTE).exists() {
                    return Err(SensorError::Persistent(format!(
                        "Climate probe {} not available",
                        device
                    )));
                }
                dir
            }
            None => Self::detect(&devices_dir).ok_or_else(|| {
                SensorError::Persistent("No supported climate probe found".to_string())
            })?,
        };

        info!("Climate probe opened at {:?}", device_dir);
        Ok(Self { device_dir })
    }

    fn detect(devices_dir: &Path) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = fs::read_dir(devices_dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .collect();
        candidates.sort();

        candidates.into_iter().find(|dir| {
            let name = fs::read_to_string(dir.join("name")).unwrap_or_default();
            debug!("Found IIO device {:?} named {:?}", dir, name.trim());
            name.trim().starts_with(DRIVER_PREFIX) && dir.join(TEMPERATURE_ATTRIBUTE).exists()
        })
    }

    /// Directory of the opened device.
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    /// Temperature in degrees Celsius.
    pub fn temperature_celsius(&self) -> Result<f64> {
        Ok(self.read_milli(TEMPERATURE_ATTRIBUTE)? / 1000.0)
    }

    /// Relative humidity as a fraction.
    pub fn relative_humidity(&self) -> Result<f64> {
        Ok(self.read_milli(HUMIDITY_ATTRIBUTE)? / 100_000.0)
    }

    /// Reads a milli-unit attribute. The driver fails reads with EIO or
    /// ETIMEDOUT when the probe misses a transfer.
    fn read_milli(&self, attribute: &str) -> Result<f64> {
        let content = fs::read_to_string(self.device_dir.join(attribute))
            .map_err(|e| SensorError::Intermittent(format!("Could not read {}: {}", attribute, e)))?;
        let milli: i64 = content.trim().parse().map_err(|_| {
            SensorError::Intermittent(format!("Unexpected {} value {:?}", attribute, content.trim()))
        })?;
        Ok(milli as f64)
    }
}

/// Process-wide handle to the climate probe.
///
/// Clones share the same slot. The probe is opened on first use and kept for
/// the lifetime of the process; a failed open leaves the slot empty.
#[derive(Debug, Clone)]
pub struct ProbeHandle {
    sys_root: PathBuf,
    device: Option<String>,
    slot: Arc<Mutex<Option<IioProbe>>>,
}

impl ProbeHandle {
    /// Creates an unopened handle. `device` of `None` or `"auto"` auto-detects.
    pub fn new(sys_root: impl Into<PathBuf>, device: Option<String>) -> Self {
        let device = device.filter(|d| !d.eq_ignore_ascii_case("auto"));
        Self {
            sys_root: sys_root.into(),
            device,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs `read` against the probe, opening it first if needed.
    pub fn with_probe<T>(&self, read: impl FnOnce(&IioProbe) -> Result<T>) -> Result<T> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SensorError::Unexpected("Climate probe lock poisoned".to_string()))?;

        if slot.is_none() {
            *slot = Some(IioProbe::open(&self.sys_root, self.device.as_deref())?);
        }

        let probe = slot
            .as_ref()
            .ok_or_else(|| SensorError::Unexpected("Climate probe missing".to_string()))?;
        read(probe)
    }

    /// Returns true once the probe has been opened.
    pub fn is_open(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl Default for ProbeHandle {
    fn default() -> Self {
        Self::new("/sys", None)
    }
}
