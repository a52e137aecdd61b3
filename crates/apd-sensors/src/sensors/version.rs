//! Runtime version sensor.
//!
//! Reports the version of the Rust toolchain that built this binary, as
//! captured by the build script from `rustc --version`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};
use crate::sensor::Sensor;

/// Output of `rustc --version` at build time.
const RUSTC_VERSION: &str = env!("APD_RUSTC_VERSION");

/// Release stage of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseLevel {
    /// Nightly and locally built dev toolchains.
    Alpha,
    Beta,
    Candidate,
    /// Stable releases.
    Final,
}

type VersionTuple = (u32, u32, u32, ReleaseLevel, u32);

/// Version as (major, minor, micro, release level, serial).
///
/// Serialized as a five element array, e.g. `[1, 82, 0, "final", 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VersionTuple", into = "VersionTuple")]
pub struct VersionInfo {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub release_level: ReleaseLevel,
    pub serial: u32,
}

impl VersionInfo {
    pub fn new(
        major: u32,
        minor: u32,
        micro: u32,
        release_level: ReleaseLevel,
        serial: u32,
    ) -> Self {
        Self {
            major,
            minor,
            micro,
            release_level,
            serial,
        }
    }

    /// Parses `rustc --version` output such as `rustc 1.84.0-beta.3 (f6e511eec 2024-10-15)`.
    pub fn parse_rustc(text: &str) -> Option<Self> {
        let text = text.trim();
        let version = text
            .strip_prefix("rustc ")
            .unwrap_or(text)
            .split_whitespace()
            .next()?;

        let (numbers, pre) = match version.split_once('-') {
            Some((numbers, pre)) => (numbers, Some(pre)),
            None => (version, None),
        };

        let mut parts = numbers.split('.');
        let mut next_number = || parts.next().and_then(|p| p.parse::<u32>().ok());
        let major = next_number()?;
        let minor = next_number()?;
        let micro = next_number()?;
        if parts.next().is_some() {
            return None;
        }

        let (release_level, serial) = match pre {
            None => (ReleaseLevel::Final, 0),
            Some(pre) => {
                let (stage, serial) = pre.split_once('.').unwrap_or((pre, "0"));
                let level = match stage {
                    "nightly" | "dev" | "alpha" => ReleaseLevel::Alpha,
                    "beta" => ReleaseLevel::Beta,
                    "rc" => ReleaseLevel::Candidate,
                    _ => return None,
                };
                (level, serial.parse().ok()?)
            }
        };

        Some(Self::new(major, minor, micro, release_level, serial))
    }

    /// Version of the toolchain that compiled this crate.
    pub fn current() -> Option<Self> {
        Self::parse_rustc(RUSTC_VERSION)
    }
}

impl From<VersionTuple> for VersionInfo {
    fn from((major, minor, micro, release_level, serial): VersionTuple) -> Self {
        Self::new(major, minor, micro, release_level, serial)
    }
}

impl From<VersionInfo> for VersionTuple {
    fn from(v: VersionInfo) -> Self {
        (v.major, v.minor, v.micro, v.release_level, v.serial)
    }
}

/// Rust toolchain version sensor.
#[derive(Debug, Default)]
pub struct RustVersion;

impl RustVersion {
    pub fn new() -> Self {
        Self
    }
}

impl Sensor for RustVersion {
    type Value = VersionInfo;

    const NAME: &'static str = "rust_version";
    const TITLE: &'static str = "Rust Version";

    fn value(&self) -> Result<VersionInfo> {
        VersionInfo::current().ok_or_else(|| {
            SensorError::Unexpected(format!("Unrecognised toolchain version {:?}", RUSTC_VERSION))
        })
    }

    fn format(value: &VersionInfo) -> String {
        if value.micro == 0 && value.release_level == ReleaseLevel::Alpha {
            format!(
                "{}.{}.{}a{}",
                value.major, value.minor, value.micro, value.serial
            )
        } else {
            format!("{}.{}", value.major, value.minor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(major: u32, minor: u32, micro: u32, level: ReleaseLevel, serial: u32) -> VersionInfo {
        VersionInfo::new(major, minor, micro, level, serial)
    }

    #[test]
    fn test_format_final() {
        let v = version(3, 8, 0, ReleaseLevel::Final, 0);
        assert_eq!(RustVersion::format(&v), "3.8");
    }

    #[test]
    fn test_format_large_version() {
        let v = version(255, 128, 1024, ReleaseLevel::Final, 512);
        assert_eq!(RustVersion::format(&v), "255.128");
    }

    #[test]
    fn test_format_first_alpha() {
        let v = version(3, 9, 0, ReleaseLevel::Alpha, 1);
        assert_eq!(RustVersion::format(&v), "3.9.0a1");
    }

    #[test]
    fn test_format_later_alpha() {
        let v = version(3, 9, 1, ReleaseLevel::Alpha, 1);
        assert_eq!(RustVersion::format(&v), "3.9");
    }

    #[test]
    fn test_parse_rustc() {
        assert_eq!(
            VersionInfo::parse_rustc("rustc 1.82.0 (f6e511eec 2024-10-15)"),
            Some(version(1, 82, 0, ReleaseLevel::Final, 0))
        );
        assert_eq!(
            VersionInfo::parse_rustc("rustc 1.84.0-beta.3 (4c39aaff6 2024-11-25)"),
            Some(version(1, 84, 0, ReleaseLevel::Beta, 3))
        );
        assert_eq!(
            VersionInfo::parse_rustc("rustc 1.85.0-nightly (a4cb3c831 2024-12-17)"),
            Some(version(1, 85, 0, ReleaseLevel::Alpha, 0))
        );
        assert_eq!(VersionInfo::parse_rustc("rustc"), None);
        assert_eq!(VersionInfo::parse_rustc("rustc 1.82"), None);
        assert_eq!(VersionInfo::parse_rustc("rustc 1.82.0-weird"), None);
    }

    #[test]
    fn test_value_is_build_toolchain() {
        let value = RustVersion.value().unwrap();
        assert_eq!(Some(value), VersionInfo::parse_rustc(RUSTC_VERSION));
    }

    #[test]
    fn test_serialize_deserialize_is_symmetric() {
        let value = version(1, 84, 0, ReleaseLevel::Beta, 3);
        let json = RustVersion::to_json_compatible(&value).unwrap();
        assert_eq!(json, json!([1, 84, 0, "beta", 3]));
        assert_eq!(RustVersion::from_json_compatible(json).unwrap(), value);
    }
}
