//! AC power status sensor.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SensorError};
use crate::sensor::Sensor;

/// Reports whether mains power is connected, via `/sys/class/power_supply`.
#[derive(Debug)]
pub struct AcStatus {
    supply_dir: PathBuf,
}

impl AcStatus {
    /// Creates a new AC status sensor under the given sysfs root.
    pub fn new(sys_root: impl Into<PathBuf>) -> Self {
        Self {
            supply_dir: sys_root.into().join("class/power_supply"),
        }
    }

    /// Lists power supplies of type `Mains`.
    fn mains_supplies(&self) -> Vec<PathBuf> {
        let mut supplies = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.supply_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let kind = fs::read_to_string(path.join("type")).unwrap_or_default();
                if kind.trim() == "Mains" {
                    supplies.push(path);
                }
            }
        }
        supplies.sort();
        supplies
    }

    fn read_online(supply: &Path) -> Result<bool> {
        let content = fs::read_to_string(supply.join("online")).map_err(|e| {
            SensorError::Intermittent(format!("Could not read AC status: {}", e))
        })?;
        match content.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(SensorError::Intermittent(format!(
                "Unexpected AC status {:?}",
                other
            ))),
        }
    }
}

impl Default for AcStatus {
    fn default() -> Self {
        Self::new("/sys")
    }
}

impl Sensor for AcStatus {
    type Value = bool;

    const NAME: &'static str = "ac_status";
    const TITLE: &'static str = "AC Connected";

    fn value(&self) -> Result<bool> {
        let supplies = self.mains_supplies();
        if supplies.is_empty() {
            return Err(SensorError::Persistent(
                "No AC power measurement circuit found".to_string(),
            ));
        }

        let mut any_read = false;
        let mut last_error = None;
        for supply in &supplies {
            debug!("Reading AC status from {:?}", supply);
            match Self::read_online(supply) {
                Ok(true) => return Ok(true),
                Ok(false) => any_read = true,
                Err(e) => {
                    debug!("Skipping {:?}: {}", supply, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_read => Err(e),
            _ => Ok(false),
        }
    }

    fn format(value: &bool) -> String {
        if *value {
            "Connected".to_string()
        } else {
            "Not connected".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::testing::FakeRoot;

    #[test]
    fn test_format() {
        assert_eq!(AcStatus::format(&true), "Connected");
        assert_eq!(AcStatus::format(&false), "Not connected");
    }

    #[test]
    fn test_connected() {
        let root = FakeRoot::new();
        root.write("class/power_supply/BAT0/type", "Battery\n");
        root.write("class/power_supply/AC/type", "Mains\n");
        root.write("class/power_supply/AC/online", "1\n");
        assert!(AcStatus::new(root.path()).value().unwrap());
    }

    #[test]
    fn test_not_connected() {
        let root = FakeRoot::new();
        root.write("class/power_supply/ADP1/type", "Mains\n");
        root.write("class/power_supply/ADP1/online", "0\n");
        assert!(!AcStatus::new(root.path()).value().unwrap());
    }

    #[test]
    fn test_no_circuit_is_persistent() {
        let root = FakeRoot::new();
        root.write("class/power_supply/BAT0/type", "Battery\n");
        let err = AcStatus::new(root.path()).value().unwrap_err();
        assert!(matches!(err, SensorError::Persistent(_)));
    }

    #[test]
    fn test_unreadable_status_is_intermittent() {
        let root = FakeRoot::new();
        root.write("class/power_supply/AC/type", "Mains\n");
        let err = AcStatus::new(root.path()).value().unwrap_err();
        assert!(matches!(err, SensorError::Intermittent(_)));

        root.write("class/power_supply/AC/online", "?\n");
        let err = AcStatus::new(root.path()).value().unwrap_err();
        assert!(matches!(err, SensorError::Intermittent(_)));
    }

    #[test]
    fn test_one_online_supply_is_enough() {
        let root = FakeRoot::new();
        root.write("class/power_supply/ADP0/type", "Mains\n");
        root.write("class/power_supply/ADP1/type", "Mains\n");
        root.write("class/power_supply/ADP1/online", "1\n");
        assert!(AcStatus::new(root.path()).value().unwrap());

        root.write("class/power_supply/ADP1/online", "0\n");
        assert!(!AcStatus::new(root.path()).value().unwrap());
    }
}
