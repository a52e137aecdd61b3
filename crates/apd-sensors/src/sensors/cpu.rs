//! CPU usage sensor.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SensorError};
use crate::sensor::Sensor;

/// Window over which CPU load is sampled.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(3);

/// CPU usage sensor.
///
/// Blocks for the whole sample interval while measuring.
#[derive(Debug)]
pub struct CpuLoad {
    stat_path: PathBuf,
    interval: Duration,
}

impl CpuLoad {
    /// Creates a new CPU sensor reading `<proc>/stat`.
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            stat_path: proc_root.into().join("stat"),
            interval: SAMPLE_INTERVAL,
        }
    }

    /// Overrides the sample interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns (idle, total) jiffies from the aggregate `cpu` line.
    fn read_cpu_stats(&self) -> Result<(u64, u64)> {
        let content = fs::read_to_string(&self.stat_path)?;
        parse_cpu_line(&content).ok_or_else(|| {
            SensorError::Unexpected(format!("Unrecognised format in {:?}", self.stat_path))
        })
    }
}

impl Default for CpuLoad {
    fn default() -> Self {
        Self::new("/proc")
    }
}

fn parse_cpu_line(content: &str) -> Option<(u64, u64)> {
    let line = content.lines().next()?;
    if !line.starts_with("cpu ") {
        return None;
    }
    let parts: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();

    if parts.len() >= 4 {
        let idle = parts[3];
        let total: u64 = parts.iter().sum();
        Some((idle, total))
    } else {
        None
    }
}

/// Fraction of non-idle time between two (idle, total) samples.
fn load_between(before: (u64, u64), after: (u64, u64)) -> f64 {
    let idle_delta = after.0.saturating_sub(before.0);
    let total_delta = after.1.saturating_sub(before.1);

    if total_delta == 0 {
        return 0.0;
    }
    (1.0 - (idle_delta as f64 / total_delta as f64)).clamp(0.0, 1.0)
}

impl Sensor for CpuLoad {
    type Value = f64;

    const NAME: &'static str = "cpu_usage";
    const TITLE: &'static str = "CPU Usage";

    fn value(&self) -> Result<f64> {
        let before = self.read_cpu_stats()?;
        std::thread::sleep(self.interval);
        let after = self.read_cpu_stats()?;
        Ok(load_between(before, after))
    }

    fn format(value: &f64) -> String {
        format!("{:.1}%", value * 100.0)
    }
}
