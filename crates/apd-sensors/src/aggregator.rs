//! Polls sensors one at a time and gathers readings and errors.
//!
//! A failing sensor never stops the rest of the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::sensor::{AnySensor, BoxedSensor, CollectionError, SensorData};

/// A failed poll as published to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: String,
    pub title: String,
    pub collected_at: DateTime<Utc>,
    pub error: String,
}

impl From<&CollectionError> for ErrorEntry {
    fn from(failure: &CollectionError) -> Self {
        Self {
            id: failure.id.clone(),
            title: failure.title.clone(),
            collected_at: failure.collected_at,
            error: failure.error.public_message(),
        }
    }
}

/// Result of polling a batch of sensors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub sensors: Vec<SensorData>,
    pub errors: Vec<ErrorEntry>,
}

impl Collection {
    fn push(&mut self, sensor: &dyn AnySensor) {
        match sensor.poll() {
            Ok(data) => self.sensors.push(data),
            Err(failure) => {
                if failure.error.is_classified() {
                    debug!("Sensor {} failed: {}", failure.id, failure.error);
                } else {
                    error!(
                        sensor = %failure.id,
                        error = %failure.error,
                        "Unhandled error while collecting sensor data"
                    );
                }
                self.errors.push(ErrorEntry::from(&failure));
            }
        }
    }
}

/// Polls every sensor in order.
pub fn collect(sensors: &[BoxedSensor]) -> Collection {
    let mut collection = Collection::default();
    for sensor in sensors {
        collection.push(sensor.as_ref());
    }
    collection
}

/// Polls only the sensors named `id`; the others are not touched.
pub fn collect_only(sensors: &[BoxedSensor], id: &str) -> Collection {
    let mut collection = Collection::default();
    for sensor in sensors.iter().filter(|sensor| sensor.name() == id) {
        collection.push(sensor.as_ref());
    }
    collection
}
