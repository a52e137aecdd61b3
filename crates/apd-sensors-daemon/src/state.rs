//! Application state management.

use std::sync::Arc;

use apd_sensors::{
    collect, collect_only, historical_values, Collection, HistoryError, HistoryStore, HostPaths,
    SensorContext, SensorData, SensorRegistry, StoredReading, TimeRange,
};

use crate::config::{Config, ConfigError};

/// Shared application state.
///
/// Every request builds fresh sensor instances from the registry; the
/// context carries the host paths and the shared climate probe.
pub struct AppState {
    registry: SensorRegistry,
    context: SensorContext,
    api_key: String,
    deployment_id: Option<String>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        config: &Config,
        registry: SensorRegistry,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        let context = SensorContext::new(HostPaths::default(), Some(config.probe.device.clone()));

        Ok(Self {
            registry,
            context,
            api_key,
            deployment_id: config.deployment_id.clone(),
            history,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    /// (id, title) of every configured sensor.
    pub fn known_sensors(&self) -> Vec<(&'static str, &'static str)> {
        self.registry.known_sensors()
    }

    /// Polls all sensors, or only those named `sensor_id`. Blocks.
    pub fn collect(&self, sensor_id: Option<&str>) -> Collection {
        let sensors = self.registry.get_sensors(&self.context);
        match sensor_id {
            Some(id) => collect_only(&sensors, id),
            None => collect(&sensors),
        }
    }

    /// Stores the successful readings of a collection, returning how many were kept.
    pub fn record(&self, collection: &Collection) -> Result<usize, HistoryError> {
        let Some(store) = &self.history else {
            return Ok(0);
        };
        for data in &collection.sensors {
            store.record(&StoredReading::from(data))?;
        }
        Ok(collection.sensors.len())
    }

    /// Historical readings within `range`, optionally for one sensor only.
    pub fn historical(
        &self,
        sensor_id: Option<&str>,
        range: &TimeRange,
    ) -> Result<Vec<SensorData>, HistoryError> {
        let mut sensors = self.registry.get_sensors(&self.context);
        if let Some(id) = sensor_id {
            sensors.retain(|sensor| sensor.name() == id);
        }
        historical_values(&sensors, self.history.as_deref(), range)
    }
}
