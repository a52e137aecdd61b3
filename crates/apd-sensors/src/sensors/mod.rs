//! Built-in sensors.
//!
//! Host sensors read `/proc` and `/sys` directly; the climate sensors share
//! one IIO probe handle.

use std::path::PathBuf;

mod climate;
mod cpu;
mod memory;
mod network;
mod power;
mod probe;
mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use climate::{Degrees, RelativeHumidity, Temperature, TemperatureUnit};
pub use cpu::{CpuLoad, SAMPLE_INTERVAL};
pub use memory::RamAvailable;
pub use network::IpAddresses;
pub use power::AcStatus;
pub use probe::{IioProbe, ProbeHandle};
pub use version::{ReleaseLevel, RustVersion, VersionInfo};

/// Filesystem roots the host sensors read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    pub proc: PathBuf,
    pub sys: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            proc: PathBuf::from("/proc"),
            sys: PathBuf::from("/sys"),
        }
    }
}

/// Resources injected into sensors when the registry builds them.
#[derive(Debug, Clone)]
pub struct SensorContext {
    pub paths: HostPaths,
    pub probe: ProbeHandle,
}

impl SensorContext {
    /// Creates a context with a fresh probe handle for `probe_device`
    /// (`None` or `"auto"` to auto-detect).
    pub fn new(paths: HostPaths, probe_device: Option<String>) -> Self {
        let probe = ProbeHandle::new(paths.sys.clone(), probe_device);
        Self { paths, probe }
    }
}

impl Default for SensorContext {
    fn default() -> Self {
        Self::new(HostPaths::default(), None)
    }
}
