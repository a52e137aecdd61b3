//! Sensor registry and loader.
//!
//! Sensors are registered under `module:TypeName` paths together with a
//! factory. Registering a sensor goes through [`SensorDescriptor::of`], which
//! only accepts types implementing [`Sensor`], so every resolvable entry
//! satisfies the contract. Non-sensor items can be registered too, so that
//! resolving them reports a clear error instead of "not found".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::LoaderError;
use crate::sensor::{BoxedSensor, Sensor};
use crate::sensors::{
    AcStatus, CpuLoad, IpAddresses, RamAvailable, RelativeHumidity, RustVersion, SensorContext,
    Temperature,
};

/// Module path the built-in sensors are registered under.
pub const BUILTIN_MODULE: &str = "apd_sensors.sensors";

type Factory = Arc<dyn Fn(&SensorContext) -> BoxedSensor + Send + Sync>;

/// Identity and constructor of a registered sensor type.
#[derive(Clone)]
pub struct SensorDescriptor {
    name: &'static str,
    title: &'static str,
    factory: Factory,
}

impl SensorDescriptor {
    /// Describes sensor type `S`, built by `build`.
    pub fn of<S, F>(build: F) -> Self
    where
        S: Sensor,
        F: Fn(&SensorContext) -> S + Send + Sync + 'static,
    {
        Self {
            name: S::NAME,
            title: S::TITLE,
            factory: Arc::new(move |context| Box::new(build(context)) as BoxedSensor),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    /// Constructs a fresh instance.
    pub fn build(&self, context: &SensorContext) -> BoxedSensor {
        (self.factory)(context)
    }
}

impl fmt::Debug for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .finish()
    }
}

/// What a registered name refers to.
#[derive(Debug, Clone)]
enum Item {
    /// A concrete sensor type.
    Sensor(SensorDescriptor),
    /// The abstract sensor contract itself.
    Contract,
    /// Anything else exported by the module.
    Other,
}

/// Maps `module:TypeName` paths to sensor factories.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    modules: BTreeMap<String, BTreeMap<String, Item>>,
    defaults: Vec<SensorDescriptor>,
}

impl SensorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in sensors as the default list.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_default(
                BUILTIN_MODULE,
                "RustVersion",
                SensorDescriptor::of(|_| RustVersion::new()),
            )
            .register_default(
                BUILTIN_MODULE,
                "IpAddresses",
                SensorDescriptor::of(|_| IpAddresses::new()),
            )
            .register_default(
                BUILTIN_MODULE,
                "CpuLoad",
                SensorDescriptor::of(|context| CpuLoad::new(context.paths.proc.clone())),
            )
            .register_default(
                BUILTIN_MODULE,
                "RamAvailable",
                SensorDescriptor::of(|context| RamAvailable::new(context.paths.proc.clone())),
            )
            .register_default(
                BUILTIN_MODULE,
                "AcStatus",
                SensorDescriptor::of(|context| AcStatus::new(context.paths.sys.clone())),
            )
            .register_default(
                BUILTIN_MODULE,
                "Temperature",
                SensorDescriptor::of(|context| Temperature::new(context.probe.clone())),
            )
            .register_default(
                BUILTIN_MODULE,
                "RelativeHumidity",
                SensorDescriptor::of(|context| RelativeHumidity::new(context.probe.clone())),
            )
            .register_contract(BUILTIN_MODULE, "Sensor")
            .register_other(BUILTIN_MODULE, "SensorContext")
            .register_other(BUILTIN_MODULE, "ProbeHandle");
        registry
    }

    fn insert(&mut self, module: &str, name: &str, item: Item) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), item);
    }

    /// Registers a sensor type so it can be loaded by path.
    pub fn register(
        &mut self,
        module: &str,
        type_name: &str,
        descriptor: SensorDescriptor,
    ) -> &mut Self {
        debug!("Registered sensor {}:{}", module, type_name);
        self.insert(module, type_name, Item::Sensor(descriptor));
        self
    }

    /// Registers a sensor type and appends it to the default list.
    pub fn register_default(
        &mut self,
        module: &str,
        type_name: &str,
        descriptor: SensorDescriptor,
    ) -> &mut Self {
        self.defaults.push(descriptor.clone());
        self.register(module, type_name, descriptor)
    }

    /// Registers the name of an abstract contract, which can never be loaded.
    pub fn register_contract(&mut self, module: &str, name: &str) -> &mut Self {
        self.insert(module, name, Item::Contract);
        self
    }

    /// Registers a name that exists in a module but is not a sensor.
    pub fn register_other(&mut self, module: &str, name: &str) -> &mut Self {
        self.insert(module, name, Item::Other);
        self
    }

    /// Descriptors of the default sensors, in polling order.
    pub fn defaults(&self) -> &[SensorDescriptor] {
        &self.defaults
    }

    /// Builds fresh instances of the default sensors, in order.
    pub fn get_sensors(&self, context: &SensorContext) -> Vec<BoxedSensor> {
        self.defaults
            .iter()
            .map(|descriptor| descriptor.build(context))
            .collect()
    }

    /// Resolves a `module:TypeName` path to a new sensor instance.
    pub fn get_sensor_by_path(
        &self,
        path: &str,
        context: &SensorContext,
    ) -> Result<BoxedSensor, LoaderError> {
        let parts: Vec<&str> = path.split(':').collect();
        let [module_name, type_name] = parts.as_slice() else {
            return Err(LoaderError::MalformedPath(path.to_string()));
        };

        let module = self
            .modules
            .get(*module_name)
            .ok_or_else(|| LoaderError::UnknownModule(module_name.to_string()))?;

        match module.get(*type_name) {
            Some(Item::Sensor(descriptor)) => Ok(descriptor.build(context)),
            Some(Item::Contract) | Some(Item::Other) => {
                Err(LoaderError::NotASensor(path.to_string()))
            }
            None => Err(LoaderError::UnknownType {
                module: module_name.to_string(),
                name: type_name.to_string(),
            }),
        }
    }

    /// (id, title) of every default sensor, without polling.
    pub fn known_sensors(&self) -> Vec<(&'static str, &'static str)> {
        self.defaults
            .iter()
            .map(|descriptor| (descriptor.name(), descriptor.title()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SensorError};
    use crate::sensors::VersionInfo;

    struct Custom;

    impl Sensor for Custom {
        type Value = u8;

        const NAME: &'static str = "custom";
        const TITLE: &'static str = "Custom";

        fn value(&self) -> Result<u8> {
            Err(SensorError::NotImplemented)
        }

        fn format(value: &u8) -> String {
            value.to_string()
        }
    }

    fn subject(path: &str) -> std::result::Result<BoxedSensor, LoaderError> {
        SensorRegistry::builtin().get_sensor_by_path(path, &SensorContext::default())
    }

    #[test]
    fn test_get_sensor_by_path() {
        let sensor = subject("apd_sensors.sensors:RustVersion").unwrap();
        assert!(sensor.as_any().downcast_ref::<RustVersion>().is_some());
        assert_eq!(sensor.name(), "rust_version");
    }

    #[test]
    fn test_invalid_format() {
        let err = subject("apd_sensors.sensors.RustVersion").unwrap_err();
        assert!(matches!(err, LoaderError::MalformedPath(_)));
        assert!(err.to_string().contains("dotted.path.to.module:TypeName"));

        let err = subject("a:b:c").unwrap_err();
        assert!(matches!(err, LoaderError::MalformedPath(_)));
    }

    #[test]
    fn test_invalid_module() {
        let err = subject("apd_sensors.nonsense:FakeSensor").unwrap_err();
        assert_eq!(
            err,
            LoaderError::UnknownModule("apd_sensors.nonsense".to_string())
        );
        assert!(err.to_string().starts_with("Could not import module"));
    }

    #[test]
    fn test_missing_sensor() {
        let err = subject("apd_sensors.sensors:FakeSensor").unwrap_err();
        assert!(matches!(err, LoaderError::UnknownType { .. }));
        assert_eq!(
            err.to_string(),
            "Could not find attribute FakeSensor in apd_sensors.sensors"
        );
    }

    #[test]
    fn test_invalid_sensor() {
        let err = subject("apd_sensors.sensors:Sensor").unwrap_err();
        assert!(matches!(err, LoaderError::NotASensor(_)));
        assert!(err.to_string().contains("is not recognised as a Sensor"));

        let err = subject("apd_sensors.sensors:ProbeHandle").unwrap_err();
        assert!(matches!(err, LoaderError::NotASensor(_)));
    }

    #[test]
    fn test_default_order() {
        let sensors = SensorRegistry::builtin().get_sensors(&SensorContext::default());
        let names: Vec<&str> = sensors.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "rust_version",
                "ip_addresses",
                "cpu_usage",
                "ram_available",
                "ac_status",
                "temperature",
                "relative_humidity",
            ]
        );
    }

    #[test]
    fn test_known_sensors() {
        let known = SensorRegistry::builtin().known_sensors();
        assert_eq!(known.len(), 7);
        assert_eq!(known[0], ("rust_version", "Rust Version"));
        assert!(known.contains(&("temperature", "Ambient Temperature")));
    }

    #[test]
    fn test_register_custom_module() {
        let mut registry = SensorRegistry::builtin();
        registry.register("my.plugins", "Custom", SensorDescriptor::of(|_| Custom));

        let sensor = registry
            .get_sensor_by_path("my.plugins:Custom", &SensorContext::default())
            .unwrap();
        assert!(sensor.as_any().downcast_ref::<Custom>().is_some());
        // Not added to the default list.
        assert_eq!(registry.known_sensors().len(), 7);
    }

    #[test]
    fn test_loaded_sensor_polls() {
        let registry = SensorRegistry::builtin();
        let context = SensorContext::default();
        let first = registry
            .get_sensor_by_path("apd_sensors.sensors:RustVersion", &context)
            .unwrap();
        let value = first.poll().unwrap();
        let expected = serde_json::to_value(VersionInfo::current().unwrap()).unwrap();
        assert_eq!(value.value, expected);
    }
}
