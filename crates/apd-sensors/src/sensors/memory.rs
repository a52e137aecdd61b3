//! Available memory sensor.

use std::fs;
use std::path::PathBuf;

use crate::error::{Result, SensorError};
use crate::sensor::Sensor;

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
const UNIT_SIZE: u64 = 1024;

/// Bytes of memory available for new allocations, from `MemAvailable`.
#[derive(Debug)]
pub struct RamAvailable {
    meminfo_path: PathBuf,
}

impl RamAvailable {
    /// Creates a new memory sensor reading `<proc>/meminfo`.
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            meminfo_path: proc_root.into().join("meminfo"),
        }
    }

    fn read_available_kb(&self) -> Result<u64> {
        let content = fs::read_to_string(&self.meminfo_path)?;
        for line in content.lines() {
            if line.starts_with("MemAvailable:") {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 {
                    if let Ok(kb) = parts[1].parse() {
                        return Ok(kb);
                    }
                }
            }
        }
        Err(SensorError::Unexpected(format!(
            "No MemAvailable entry in {:?}",
            self.meminfo_path
        )))
    }
}

impl Default for RamAvailable {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl Sensor for RamAvailable {
    type Value = u64;

    const NAME: &'static str = "ram_available";
    const TITLE: &'static str = "RAM Available";

    fn value(&self) -> Result<u64> {
        Ok(self.read_available_kb()?.saturating_mul(1024))
    }

    fn format(value: &u64) -> String {
        let mut magnitude = 0;
        let mut scale = 1u64;
        while magnitude < UNITS.len() - 1 && *value / scale >= UNIT_SIZE {
            scale *= UNIT_SIZE;
            magnitude += 1;
        }
        format!("{:.1} {}", *value as f64 / scale as f64, UNITS[magnitude])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::testing::FakeRoot;

    #[test]
    fn test_format_units() {
        assert_eq!(RamAvailable::format(&0), "0.0 B");
        assert_eq!(RamAvailable::format(&1023), "1023.0 B");
        assert_eq!(RamAvailable::format(&1024), "1.0 KiB");
        assert_eq!(RamAvailable::format(&(512 * 1024 * 1024)), "512.0 MiB");
        assert_eq!(RamAvailable::format(&(3 * 1024 * 1024 * 1024 / 2)), "1.5 GiB");
    }

    #[test]
    fn test_format_clamps_to_largest_unit() {
        assert_eq!(RamAvailable::format(&(1u64 << 60)), "1.0 EiB");
        assert_eq!(RamAvailable::format(&u64::MAX), "16.0 EiB");
    }

    #[test]
    fn test_value_from_fake_proc() {
        let root = FakeRoot::new();
        root.write(
            "meminfo",
            "MemTotal:       16318756 kB\nMemFree:         1048576 kB\nMemAvailable:    8388608 kB\n",
        );
        let sensor = RamAvailable::new(root.path());
        assert_eq!(sensor.value().unwrap(), 8 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_missing_entry() {
        let root = FakeRoot::new();
        root.write("meminfo", "MemTotal:       16318756 kB\n");
        let sensor = RamAvailable::new(root.path());
        assert!(matches!(sensor.value(), Err(SensorError::Unexpected(_))));
    }
}
