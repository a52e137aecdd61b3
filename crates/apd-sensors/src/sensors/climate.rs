//! Ambient temperature and relative humidity sensors.
//!
//! Both read the shared climate probe through a [`ProbeHandle`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::probe::ProbeHandle;
use crate::codec::{self, Quantity};
use crate::error::Result;
use crate::sensor::Sensor;

/// Significant digits shown for each temperature scale.
const SIGNIFICANT_DIGITS: i32 = 3;

/// Temperature scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    /// Unit name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "degree_Celsius",
            TemperatureUnit::Fahrenheit => "degree_Fahrenheit",
            TemperatureUnit::Kelvin => "kelvin",
        }
    }

    /// Display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "degree_Celsius" | "°C" => Ok(TemperatureUnit::Celsius),
            "degree_Fahrenheit" | "°F" => Ok(TemperatureUnit::Fahrenheit),
            "kelvin" | "K" => Ok(TemperatureUnit::Kelvin),
            _ => Err(format!("Unknown temperature unit: {}", s)),
        }
    }
}

/// A temperature magnitude in a given unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Degrees {
    pub magnitude: f64,
    pub unit: TemperatureUnit,
}

impl Degrees {
    pub fn new(magnitude: f64, unit: TemperatureUnit) -> Self {
        Self { magnitude, unit }
    }

    pub fn celsius(magnitude: f64) -> Self {
        Self::new(magnitude, TemperatureUnit::Celsius)
    }

    pub fn fahrenheit(magnitude: f64) -> Self {
        Self::new(magnitude, TemperatureUnit::Fahrenheit)
    }

    pub fn kelvin(magnitude: f64) -> Self {
        Self::new(magnitude, TemperatureUnit::Kelvin)
    }

    pub fn to_celsius(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Celsius => self.magnitude,
            TemperatureUnit::Fahrenheit => (self.magnitude - 32.0) * 5.0 / 9.0,
            TemperatureUnit::Kelvin => self.magnitude - 273.15,
        }
    }

    pub fn to_fahrenheit(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Fahrenheit => self.magnitude,
            _ => self.to_celsius() * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Rounds to a number of significant digits.
fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    if !value.is_finite() {
        return value;
    }
    let exponent = digits - 1 - value.abs().log10().floor() as i32;
    let scale = 10f64.powi(exponent.abs());
    if exponent >= 0 {
        (value * scale).round() / scale
    } else {
        (value / scale).round() * scale
    }
}

/// Formats a magnitude in plain decimal notation, keeping a trailing ".0" on
/// whole numbers.
fn format_magnitude(value: f64) -> String {
    let rounded = round_significant(value, SIGNIFICANT_DIGITS);
    if !rounded.is_finite() {
        return rounded.to_string();
    }
    let decimals = if rounded == 0.0 {
        1
    } else {
        (SIGNIFICANT_DIGITS - 1 - rounded.abs().log10().floor() as i32).max(1) as usize
    };
    let text = format!("{:.*}", decimals, rounded);
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Ambient temperature sensor.
#[derive(Debug, Clone)]
pub struct Temperature {
    probe: ProbeHandle,
}

impl Temperature {
    pub fn new(probe: ProbeHandle) -> Self {
        Self { probe }
    }
}

impl Sensor for Temperature {
    type Value = Degrees;

    const NAME: &'static str = "temperature";
    const TITLE: &'static str = "Ambient Temperature";

    fn value(&self) -> Result<Degrees> {
        self.probe
            .with_probe(|probe| probe.temperature_celsius())
            .map(Degrees::celsius)
    }

    fn format(value: &Degrees) -> String {
        format!(
            "{} {} ({} {})",
            format_magnitude(value.to_celsius()),
            TemperatureUnit::Celsius.symbol(),
            format_magnitude(value.to_fahrenheit()),
            TemperatureUnit::Fahrenheit.symbol(),
        )
    }

    fn to_json_compatible(value: &Degrees) -> Result<Value> {
        Quantity::new(value.magnitude, value.unit.as_str()).to_json()
    }

    fn from_json_compatible(json: Value) -> Result<Degrees> {
        let quantity = Quantity::from_json(json)?;
        let unit = quantity.unit.parse().map_err(codec::invalid)?;
        Ok(Degrees::new(quantity.magnitude, unit))
    }
}

/// Relative humidity sensor, as a fraction.
#[derive(Debug, Clone)]
pub struct RelativeHumidity {
    probe: ProbeHandle,
}

impl RelativeHumidity {
    pub fn new(probe: ProbeHandle) -> Self {
        Self { probe }
    }
}

impl Sensor for RelativeHumidity {
    type Value = f64;

    const NAME: &'static str = "relative_humidity";
    const TITLE: &'static str = "Relative Humidity";

    fn value(&self) -> Result<f64> {
        self.probe.with_probe(|probe| probe.relative_humidity())
    }

    fn format(value: &f64) -> String {
        format!("{:.1}%", value * 100.0)
    }
}
