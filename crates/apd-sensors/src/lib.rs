//! apd sensors
//!
//! Collects point-in-time readings from host and environment sensors, formats
//! them for display and serializes them for the wire through one uniform
//! sensor contract.

pub mod aggregator;
pub mod codec;
pub mod error;
pub mod history;
pub mod registry;
pub mod sensor;
pub mod sensors;

pub use aggregator::{collect, collect_only, Collection, ErrorEntry};
pub use error::{LoaderError, Result, SensorError};
pub use history::{
    historical_values, HistoryError, HistoryStore, MemoryStore, StoredReading, TimeRange,
};
pub use registry::{SensorDescriptor, SensorRegistry, BUILTIN_MODULE};
pub use sensor::{AnySensor, BoxedSensor, CollectionError, Reading, Sensor, SensorData};
pub use sensors::{HostPaths, ProbeHandle, SensorContext};
