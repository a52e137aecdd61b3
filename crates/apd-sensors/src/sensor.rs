//! The sensor contract.
//!
//! [`Sensor`] is the typed trait every data source implements. [`AnySensor`]
//! is its object-safe counterpart, implemented for every `Sensor`, which lets
//! heterogeneous sensors be polled through one pipeline.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::error::{Result, SensorError};
use crate::history::TimeRange;

/// Trait for all sensors.
pub trait Sensor: Send + 'static {
    /// The in-memory value this sensor measures.
    type Value: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug;

    /// Stable machine identifier.
    const NAME: &'static str;

    /// Display label.
    const TITLE: &'static str;

    /// Performs the measurement. May block.
    fn value(&self) -> Result<Self::Value>;

    /// Renders a value for humans. Must be total over the values `value()` produces.
    fn format(value: &Self::Value) -> String;

    /// Converts a value to its JSON-compatible form.
    fn to_json_compatible(value: &Self::Value) -> Result<Value> {
        codec::encode(value)
    }

    /// Inverse of [`Sensor::to_json_compatible`].
    fn from_json_compatible(json: Value) -> Result<Self::Value> {
        codec::decode(json)
    }

    /// Readings the sensor can produce for a past time range by itself.
    fn historical(&self, _range: &TimeRange) -> Result<Vec<(DateTime<Utc>, Self::Value)>> {
        Err(SensorError::NotImplemented)
    }
}

/// A single measurement with the identity of the sensor that took it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading<V> {
    pub id: &'static str,
    pub title: &'static str,
    pub value: V,
    pub collected_at: DateTime<Utc>,
}

impl<V> Reading<V> {
    /// Human-readable text for this reading.
    pub fn format<S: Sensor<Value = V>>(&self) -> String {
        S::format(&self.value)
    }

    /// Formats and serializes the reading for display and transfer.
    pub fn to_sensor_data<S: Sensor<Value = V>>(&self) -> Result<SensorData> {
        Ok(SensorData {
            id: self.id.to_string(),
            title: self.title.to_string(),
            value: S::to_json_compatible(&self.value)?,
            human_readable: self.format::<S>(),
            collected_at: self.collected_at,
        })
    }
}

/// A formatted, serialized reading: the form that crosses the process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub id: String,
    pub title: String,
    pub value: Value,
    pub human_readable: String,
    pub collected_at: DateTime<Utc>,
}

/// A failed poll, produced instead of a reading.
#[derive(Debug)]
pub struct CollectionError {
    pub id: String,
    pub title: String,
    pub collected_at: DateTime<Utc>,
    pub error: SensorError,
}

impl CollectionError {
    pub fn new(id: &str, title: &str, collected_at: DateTime<Utc>, error: SensorError) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            collected_at,
            error,
        }
    }
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.error)
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Object-safe view of a [`Sensor`].
pub trait AnySensor: Send {
    fn name(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Measures once, yielding exactly one of a reading or an error.
    fn poll(&self) -> std::result::Result<SensorData, CollectionError>;

    /// Decodes a stored JSON value and formats it.
    fn format_json(&self, json: &Value) -> Result<String>;

    /// Historical readings produced by the sensor itself.
    fn historical_data(&self, range: &TimeRange) -> Result<Vec<SensorData>>;

    fn as_any(&self) -> &dyn Any;
}

/// Owned, type-erased sensor.
pub type BoxedSensor = Box<dyn AnySensor>;

impl<S: Sensor> AnySensor for S {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn title(&self) -> &'static str {
        S::TITLE
    }

    fn poll(&self) -> std::result::Result<SensorData, CollectionError> {
        let outcome = self.value();
        let collected_at = Utc::now();
        let failed = |error| CollectionError::new(S::NAME, S::TITLE, collected_at, error);

        let value = outcome.map_err(failed)?;
        Reading {
            id: S::NAME,
            title: S::TITLE,
            value,
            collected_at,
        }
        .to_sensor_data::<S>()
        .map_err(failed)
    }

    fn format_json(&self, json: &Value) -> Result<String> {
        let value = S::from_json_compatible(json.clone())?;
        Ok(S::format(&value))
    }

    fn historical_data(&self, range: &TimeRange) -> Result<Vec<SensorData>> {
        self.historical(range)?
            .into_iter()
            .map(|(collected_at, value)| {
                Reading {
                    id: S::NAME,
                    title: S::TITLE,
                    value,
                    collected_at,
                }
                .to_sensor_data::<S>()
            })
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for dyn AnySensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name())
            .field("title", &self.title())
            .finish()
    }
}
