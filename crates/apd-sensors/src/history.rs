//! Historical readings.
//!
//! Serialized readings can be kept by a [`HistoryStore`] and queried back by
//! time range. Stored values are decoded through their sensor's codec so they
//! can be formatted again, and merged with readings from sensors that keep
//! their own history.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::error::SensorError;
use crate::sensor::{BoxedSensor, SensorData};

/// 1900-01-01T00:00:00Z, the start of an open-ended range.
const DEFAULT_START_TIMESTAMP: i64 = -2_208_988_800;

/// Errors from a storage backend.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("History store lock poisoned")]
    Poisoned,
}

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Builds a range, defaulting to 1900-01-01 for the start and now for the end.
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start: start.unwrap_or_else(Self::default_start),
            end: end.unwrap_or_else(Utc::now),
        }
    }

    pub fn default_start() -> DateTime<Utc> {
        DateTime::from_timestamp(DEFAULT_START_TIMESTAMP, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// True if `instant` lies within the range, bounds included.
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }

    /// Parses a range bound: RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
    /// Bounds without an offset are taken as UTC.
    pub fn parse_bound(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
            return Some(instant.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// A serialized reading as kept by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub sensor_id: String,
    pub collected_at: DateTime<Utc>,
    pub data: Value,
}

impl From<&SensorData> for StoredReading {
    fn from(data: &SensorData) -> Self {
        Self {
            sensor_id: data.id.clone(),
            collected_at: data.collected_at,
            data: data.value.clone(),
        }
    }
}

/// Storage backend for serialized readings.
pub trait HistoryStore: Send + Sync {
    fn record(&self, reading: &StoredReading) -> Result<(), HistoryError>;

    /// Readings collected within `range`, oldest first.
    fn query(&self, range: &TimeRange) -> Result<Vec<StoredReading>, HistoryError>;
}

/// Store that keeps readings in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: Mutex<Vec<StoredReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn record(&self, reading: &StoredReading) -> Result<(), HistoryError> {
        let mut readings = self.readings.lock().map_err(|_| HistoryError::Poisoned)?;
        readings.push(reading.clone());
        Ok(())
    }

    fn query(&self, range: &TimeRange) -> Result<Vec<StoredReading>, HistoryError> {
        let readings = self.readings.lock().map_err(|_| HistoryError::Poisoned)?;
        let mut found: Vec<StoredReading> = readings
            .iter()
            .filter(|reading| range.contains(&reading.collected_at))
            .cloned()
            .collect();
        found.sort_by_key(|reading| reading.collected_at);
        Ok(found)
    }
}

/// Collects historical readings for `sensors` within `range`.
///
/// Stored readings come first, for sensors in `sensors` only; then readings
/// the sensors produce themselves.
pub fn historical_values(
    sensors: &[BoxedSensor],
    store: Option<&dyn HistoryStore>,
    range: &TimeRange,
) -> Result<Vec<SensorData>, HistoryError> {
    let mut values = Vec::new();

    if let Some(store) = store {
        for stored in store.query(range)? {
            let Some(sensor) = sensors.iter().find(|s| s.name() == stored.sensor_id) else {
                continue;
            };
            match sensor.format_json(&stored.data) {
                Ok(human_readable) => values.push(SensorData {
                    id: sensor.name().to_string(),
                    title: sensor.title().to_string(),
                    value: stored.data,
                    human_readable,
                    collected_at: stored.collected_at,
                }),
                Err(e) => warn!(
                    "Skipping stored {} reading from {}: {}",
                    stored.sensor_id, stored.collected_at, e
                ),
            }
        }
    }

    for sensor in sensors {
        match sensor.historical_data(range) {
            Ok(readings) => values.extend(
                readings
                    .into_iter()
                    .filter(|reading| range.contains(&reading.collected_at)),
            ),
            Err(SensorError::NotImplemented) => {}
            Err(e) => warn!("Could not get history for {}: {}", sensor.name(), e),
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::sensor::Sensor;
    use crate::sensors::{Degrees, ProbeHandle, RustVersion, Temperature};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn stored(sensor_id: &str, hour: u32, data: Value) -> StoredReading {
        StoredReading {
            sensor_id: sensor_id.to_string(),
            collected_at: at(hour),
            data,
        }
    }

    /// Sensor that remembers one reading per hour since midnight.
    struct Logger;

    impl Sensor for Logger {
        type Value = u32;
        const NAME: &'static str = "logger";
        const TITLE: &'static str = "Logger";

        fn value(&self) -> Result<u32> {
            Ok(0)
        }

        fn format(value: &u32) -> String {
            format!("#{}", value)
        }

        fn historical(&self, _range: &TimeRange) -> Result<Vec<(DateTime<Utc>, u32)>> {
            Ok((0..24).map(|hour| (at(hour), hour)).collect())
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = TimeRange::new(at(1), at(3));
        assert!(range.contains(&at(1)));
        assert!(range.contains(&at(3)));
        assert!(!range.contains(&(at(3) + Duration::microseconds(1))));
        assert!(!range.contains(&at(0)));
    }

    #[test]
    fn test_default_range() {
        let range = TimeRange::between(None, None);
        assert_eq!(range.start.to_rfc3339(), "1900-01-01T00:00:00+00:00");
        assert!(range.end <= Utc::now());
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(TimeRange::parse_bound("2024-03-01T05:00:00Z"), Some(at(5)));
        assert_eq!(TimeRange::parse_bound("2024-03-01T07:00:00+02:00"), Some(at(5)));
        assert_eq!(TimeRange::parse_bound("2024-03-01T05:00:00"), Some(at(5)));
        assert_eq!(TimeRange::parse_bound("2024-03-01"), Some(at(0)));
        assert_eq!(TimeRange::parse_bound("yesterday"), None);
    }

    #[test]
    fn test_memory_store_query() {
        let store = MemoryStore::new();
        for hour in [4, 1, 2, 3] {
            store.record(&stored("x", hour, json!(hour))).unwrap();
        }
        let found = store.query(&TimeRange::new(at(2), at(3))).unwrap();
        let hours: Vec<Value> = found.into_iter().map(|r| r.data).collect();
        assert_eq!(hours, vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_stored_values_are_reformatted() {
        let store = MemoryStore::new();
        let value = Temperature::to_json_compatible(&Degrees::celsius(21.0)).unwrap();
        store.record(&stored("temperature", 1, value.clone())).unwrap();
        store.record(&stored("unknown_sensor", 1, json!(1))).unwrap();
        store.record(&stored("temperature", 2, json!("not a quantity"))).unwrap();

        let sensors: Vec<BoxedSensor> = vec![Box::new(Temperature::new(ProbeHandle::default()))];
        let values =
            historical_values(&sensors, Some(&store), &TimeRange::between(None, None)).unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].id, "temperature");
        assert_eq!(values[0].title, "Ambient Temperature");
        assert_eq!(values[0].value, value);
        assert_eq!(values[0].human_readable, "21.0 °C (69.8 °F)");
        assert_eq!(values[0].collected_at, at(1));
    }

    #[test]
    fn test_sensor_history_is_merged() {
        let store = MemoryStore::new();
        store.record(&stored("logger", 12, json!(99))).unwrap();

        let sensors: Vec<BoxedSensor> = vec![Box::new(Logger), Box::new(RustVersion)];
        let values =
            historical_values(&sensors, Some(&store), &TimeRange::new(at(10), at(12))).unwrap();

        let text: Vec<&str> = values.iter().map(|v| v.human_readable.as_str()).collect();
        assert_eq!(text, vec!["#99", "#10", "#11", "#12"]);
    }

    #[test]
    fn test_without_store() {
        let sensors: Vec<BoxedSensor> = vec![Box::new(RustVersion)];
        let values = historical_values(&sensors, None, &TimeRange::between(None, None)).unwrap();
        assert!(values.is_empty());
    }
}
