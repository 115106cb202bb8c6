use std::collections::VecDeque;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::discovery::DiscoveryPayload;

/// Read function wrapped by a sensor or number entity.
///
/// Assumed synchronous and side-effect-free; failures are not caught by the
/// entity and propagate to the caller of the device-level operation.
pub type ReadFn = Box<dyn FnMut() -> anyhow::Result<f64> + Send>;

/// Device class for sensors, matching Home Assistant's sensor device classes.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorClass {
    Battery,
    Current,
    Duration,
    Energy,
    Frequency,
    Humidity,
    Illuminance,
    Moisture,
    Power,
    Pressure,
    SignalStrength,
    Temperature,
    Voltage,
}

/// A named, read-only data source with a bounded-or-unbounded queue of
/// historical readings.
///
/// Constructed by the caller, then registered with a `Device`, which fills in
/// the topic and identity fields. Registration must happen exactly once,
/// before any publish involving the sensor.
pub struct Sensor {
    name: String,
    sanitized_name: String,
    read_fn: ReadFn,
    pub(crate) precision: u32,
    /// `{device_name}_{sanitized_name}`, set at registration
    pub(crate) device_qualified_name: String,
    pub(crate) discovery_topic: String,
    pub(crate) discovery: DiscoveryPayload,
    cache: VecDeque<f64>,
    cache_limit: Option<usize>,
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name)
            .field("precision", &self.precision)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Sensor {
    /// A sensor with no device class, no unit, precision 0 and an unbounded
    /// cache. Physical metadata and bounds are added with the `with_*`
    /// builders before registration.
    pub fn new(name: impl Into<String>, read_fn: ReadFn) -> Self {
        let name = name.into();
        let sanitized_name = name.replace(' ', "_");
        let discovery = DiscoveryPayload::new(&name);
        Self {
            name,
            sanitized_name,
            read_fn,
            precision: 0,
            device_qualified_name: String::new(),
            discovery_topic: String::new(),
            discovery,
            cache: VecDeque::new(),
            cache_limit: None,
        }
    }

    /// Decimal places for the hub-side rounding template.
    #[must_use]
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_device_class(mut self, class: SensorClass) -> Self {
        self.discovery.device_class = Some(class.to_string());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.discovery.unit_of_measurement = Some(unit.into());
        self
    }

    /// Cap the historical cache. When full, pushing drops the oldest value.
    /// Without a cap the cache grows until drained.
    #[must_use]
    pub fn with_cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name with spaces replaced by underscores; JSON key and topic
    /// fragment for this sensor.
    pub fn sanitized_name(&self) -> &str {
        &self.sanitized_name
    }

    /// `{device_name}_{sanitized_name}`; empty until registered.
    pub fn device_qualified_name(&self) -> &str {
        &self.device_qualified_name
    }

    pub fn discovery_topic(&self) -> &str {
        &self.discovery_topic
    }

    pub fn discovery(&self) -> &DiscoveryPayload {
        &self.discovery
    }

    pub(crate) fn has_physical_metadata(&self) -> bool {
        self.discovery.device_class.is_some() || self.discovery.unit_of_measurement.is_some()
    }

    /// Invoke the wrapped read function, appending the result to the cache
    /// when `cache` is true. Read failures propagate uncaught.
    pub fn read(&mut self, cache: bool) -> anyhow::Result<f64> {
        let value = (self.read_fn)()?;
        if cache {
            if let Some(limit) = self.cache_limit {
                if self.cache.len() == limit {
                    self.cache.pop_front();
                }
            }
            self.cache.push_back(value);
        }
        Ok(value)
    }

    /// Remove and return the oldest cached value. Never blocks.
    pub fn pop_cache(&mut self) -> Option<f64> {
        self.cache.pop_front()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_sensor(name: &str) -> Sensor {
        let mut next = 0.0;
        Sensor::new(
            name,
            Box::new(move || {
                next += 1.0;
                Ok(next)
            }),
        )
    }

    #[test]
    fn test_sanitized_name() {
        let sensor = counting_sensor("Soil Moisture Front");
        assert_eq!(sensor.sanitized_name(), "Soil_Moisture_Front");
        assert_eq!(sensor.name(), "Soil Moisture Front");
    }

    #[test]
    fn test_read_caches_in_fifo_order() {
        let mut sensor = counting_sensor("Counter");
        sensor.read(true).unwrap();
        sensor.read(true).unwrap();
        sensor.read(false).unwrap();

        assert_eq!(sensor.cache_len(), 2);
        assert_eq!(sensor.pop_cache(), Some(1.0));
        assert_eq!(sensor.pop_cache(), Some(2.0));
        assert_eq!(sensor.pop_cache(), None);
    }

    #[test]
    fn test_cache_limit_drops_oldest() {
        let mut sensor = counting_sensor("Counter").with_cache_limit(2);
        sensor.read(true).unwrap();
        sensor.read(true).unwrap();
        sensor.read(true).unwrap();

        assert_eq!(sensor.cache_len(), 2);
        assert_eq!(sensor.pop_cache(), Some(2.0));
        assert_eq!(sensor.pop_cache(), Some(3.0));
    }

    #[test]
    fn test_read_error_propagates_without_caching() {
        let mut sensor = Sensor::new("Broken", Box::new(|| anyhow::bail!("i2c timeout")));
        assert!(sensor.read(true).is_err());
        assert_eq!(sensor.cache_len(), 0);
    }

    #[test]
    fn test_sensor_class_display() {
        assert_eq!(SensorClass::Temperature.to_string(), "temperature");
        assert_eq!(SensorClass::SignalStrength.to_string(), "signal_strength");
    }
}
