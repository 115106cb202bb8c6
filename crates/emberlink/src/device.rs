use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::config::DeviceConfig;
use crate::discovery::DeviceDescriptor;
use crate::logs::LogEntry;
use crate::logs::LogRecord;
use crate::number::NumericControl;
use crate::platform;
use crate::platform::PlatformError;
use crate::sensor::Sensor;
use crate::topic;
use crate::topic::Component;
use crate::transport::Qos;
use crate::transport::Transport;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to retrieve hardware id: {0}")]
    HardwareId(#[from] PlatformError),

    #[error("entity {name:?} already registered with device {device:?}")]
    DuplicateEntity { name: String, device: String },

    #[error("sensor {name:?} not registered with device {device:?}")]
    UnregisteredSensor { name: String, device: String },

    #[error("log record is not valid UTF-8: {0}")]
    InvalidLogEntry(#[from] std::string::FromUtf8Error),

    #[error("read failed for {name:?}: {error}")]
    Read { name: String, error: anyhow::Error },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Aggregator for a device's sensors and numeric controls.
///
/// Owns its entities and the transport. Each entity is registered once, which
/// copies the device identity into the entity's discovery metadata; after
/// that the device drives two publication cycles: discovery announcements
/// (`send_discovery`) and state publication (`publish_sensors`,
/// `publish_numbers`, `publish_logs`).
pub struct Device<T: Transport> {
    name: String,
    /// Device name with spaces replaced by underscores; prefix for every
    /// entity's device-qualified name
    sanitized_name: String,
    device_id: String,
    discovery_prefix: String,
    descriptor: DeviceDescriptor,
    log_topic: String,
    number_base_topic: String,
    sensor_base_topic: String,
    transport: T,
    sensors: Vec<Sensor>,
    numbers: Vec<NumericControl>,
    /// Last known value per sensor, keyed by sanitized name; `None` until the
    /// first cached reading is drained
    last_values: HashMap<String, Option<f64>>,
}

impl<T: Transport> Device<T> {
    /// Construct a device, deriving its identity from this host's hardware
    /// id. Fails when no hardware id source is available; there is no
    /// recovery path.
    pub fn new(config: &DeviceConfig, transport: T) -> Result<Self, DeviceError> {
        let hardware_id = platform::hardware_id()?;
        Ok(Self::with_hardware_id(config, &hardware_id, transport))
    }

    /// Construct a device from explicit hardware id bytes.
    ///
    /// The device id is `{model}-{hex(hardware_id)}`: stable across restarts
    /// and unique across devices of the same model.
    pub fn with_hardware_id(config: &DeviceConfig, hardware_id: &[u8], transport: T) -> Self {
        let hex_id = platform::hex_encode(hardware_id);
        let device_id = format!("{}-{}", config.model, hex_id);
        let prefix = &config.discovery_prefix;

        let descriptor = DeviceDescriptor {
            identifiers: hex_id,
            manufacturer: platform::manufacturer().to_string(),
            model: platform::machine().to_string(),
            name: config.name.clone(),
            sw_version: platform::firmware_version().to_string(),
        };

        Self {
            name: config.name.clone(),
            sanitized_name: config.name.replace(' ', "_"),
            log_topic: topic::base_topic(prefix, Component::Logs, &device_id),
            number_base_topic: topic::base_topic(prefix, Component::Number, &device_id),
            sensor_base_topic: topic::base_topic(prefix, Component::Sensor, &device_id),
            device_id,
            discovery_prefix: prefix.clone(),
            descriptor,
            transport,
            sensors: Vec::new(),
            numbers: Vec::new(),
            last_values: HashMap::new(),
        }
    }

    /// Stable device identifier; all derived topics use it.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Register a sensor, copying the device identity into its discovery
    /// metadata. Must happen exactly once per sensor, before any publish
    /// involving it. Rejects a sanitized name already present in the sensor
    /// set.
    pub fn add_sensor(&mut self, mut sensor: Sensor) -> Result<(), DeviceError> {
        debug!("Adding sensor: {}", sensor.name());

        if self.last_values.contains_key(sensor.sanitized_name()) {
            return Err(DeviceError::DuplicateEntity {
                name: sensor.name().to_string(),
                device: self.name.clone(),
            });
        }

        // Prepend the device name to further differentiate the entity
        let qualified = format!("{}_{}", self.sanitized_name, sensor.sanitized_name());
        let unique_id = format!("{}_{}", self.device_id, qualified);

        sensor.discovery_topic =
            topic::discovery_topic(&self.discovery_prefix, Component::Sensor, &unique_id);
        sensor.discovery.base_topic = Some(self.sensor_base_topic.clone());
        sensor.discovery.object_id = Some(qualified.clone());
        sensor.discovery.unique_id = Some(unique_id);
        sensor.discovery.device = Some(self.descriptor.clone());

        // Hub convention: only physically-classed sensors are marked as
        // continuous measurements and get a rounding clause.
        if sensor.has_physical_metadata() {
            sensor.discovery.state_class = Some("measurement".to_string());
            sensor.discovery.value_template = Some(format!(
                "{{{{ value_json.{} | round({}) }}}}",
                sensor.sanitized_name(),
                sensor.precision
            ));
        } else {
            sensor.discovery.value_template =
                Some(format!("{{{{ value_json.{} }}}}", sensor.sanitized_name()));
        }

        sensor.device_qualified_name = qualified;

        self.last_values
            .insert(sensor.sanitized_name().to_string(), None);
        self.sensors.push(sensor);
        Ok(())
    }

    /// Register a numeric control. Same protocol as `add_sensor`, minus the
    /// state-class branch: numbers always round to their precision.
    pub fn add_number(&mut self, mut number: NumericControl) -> Result<(), DeviceError> {
        debug!("Adding number: {}", number.name());

        if self
            .numbers
            .iter()
            .any(|n| n.sanitized_name() == number.sanitized_name())
        {
            return Err(DeviceError::DuplicateEntity {
                name: number.name().to_string(),
                device: self.name.clone(),
            });
        }

        let qualified = format!("{}_{}", self.sanitized_name, number.sanitized_name());
        let unique_id = format!("{}_{}", self.device_id, qualified);

        number.discovery_topic =
            topic::discovery_topic(&self.discovery_prefix, Component::Number, &unique_id);
        number.discovery.base_topic = Some(self.number_base_topic.clone());
        number.discovery.object_id = Some(qualified.clone());
        number.discovery.unique_id = Some(unique_id);
        number.discovery.device = Some(self.descriptor.clone());
        number.discovery.value_template = Some(format!(
            "{{{{ value_json.{} | round({}) }}}}",
            number.sanitized_name(),
            number.precision
        ));

        number.device_qualified_name = qualified;

        self.numbers.push(number);
        Ok(())
    }

    /// Publish log records to the device's log topic, one retained publish
    /// per entry.
    ///
    /// The whole batch is converted to structured entries before anything is
    /// sent, so an undecodable record publishes nothing.
    pub async fn publish_logs(
        &mut self,
        records: impl IntoIterator<Item = LogRecord>,
    ) -> Result<(), DeviceError> {
        let entries: Vec<LogEntry> = records
            .into_iter()
            .map(LogEntry::try_from)
            .collect::<Result<_, _>>()?;

        for entry in entries {
            let payload = serde_json::to_string(&entry)?;
            self.transport
                .publish(&self.log_topic, payload.as_bytes(), true, Qos::AtLeastOnce)
                .await?;
        }
        Ok(())
    }

    /// Read every numeric control and publish one retained state payload.
    /// Deliberate no-op when no numbers are registered.
    pub async fn publish_numbers(&mut self) -> Result<(), DeviceError> {
        if self.numbers.is_empty() {
            return Ok(());
        }

        let state_topic = topic::state_topic(&self.number_base_topic);

        let mut payload = serde_json::Map::new();
        for number in &mut self.numbers {
            let value = number.read().map_err(|error| DeviceError::Read {
                name: number.name().to_string(),
                error,
            })?;
            payload.insert(number.sanitized_name().to_string(), value.into());
        }

        let body = serde_json::to_string(&Value::Object(payload))?;
        debug!("Publishing to {}: {}", state_topic, body);
        self.transport
            .publish(&state_topic, body.as_bytes(), true, Qos::AtLeastOnce)
            .await?;
        Ok(())
    }

    /// Drain all sensor caches into retained state publishes.
    ///
    /// Runs one drain cycle per depth of the deepest cache. Each cycle pops
    /// one value per sensor where available (a sensor with an exhausted cache
    /// keeps its last known value, `null` if it never read) and publishes the
    /// entire snapshot as one JSON object. Sensors sampled at different
    /// cadences interleave into a time-ordered sequence of publishes, at the
    /// cost of re-sending stale values for sensors with shallower caches.
    /// Deliberate no-op when no sensors are registered.
    pub async fn publish_sensors(&mut self) -> Result<(), DeviceError> {
        if self.sensors.is_empty() {
            return Ok(());
        }

        let state_topic = topic::state_topic(&self.sensor_base_topic);
        let depth = self
            .sensors
            .iter()
            .map(Sensor::cache_len)
            .max()
            .unwrap_or(0);

        for _ in 0..depth {
            for sensor in &mut self.sensors {
                if let Some(value) = sensor.pop_cache() {
                    self.last_values
                        .insert(sensor.sanitized_name().to_string(), Some(value));
                }
            }

            // Snapshot in sensor registration order
            let mut payload = serde_json::Map::new();
            for sensor in &self.sensors {
                let value = self
                    .last_values
                    .get(sensor.sanitized_name())
                    .copied()
                    .flatten();
                payload.insert(
                    sensor.sanitized_name().to_string(),
                    value.map_or(Value::Null, Value::from),
                );
            }

            let body = serde_json::to_string(&Value::Object(payload))?;
            debug!("Publishing to {}: {}", state_topic, body);
            self.transport
                .publish(&state_topic, body.as_bytes(), true, Qos::AtLeastOnce)
                .await?;
        }
        Ok(())
    }

    /// Read an individual sensor by display name, caching the value for
    /// publication when `cache` is true. Fails when the sensor is not
    /// registered with this device.
    pub fn read(&mut self, name: &str, cache: bool) -> Result<f64, DeviceError> {
        let device = self.name.clone();
        let sensor = self
            .sensors
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| DeviceError::UnregisteredSensor {
                name: name.to_string(),
                device,
            })?;

        sensor.read(cache).map_err(|error| DeviceError::Read {
            name: name.to_string(),
            error,
        })
    }

    /// Read every registered sensor, caching values for publication when
    /// `cache` is true. Returns readings keyed by display name.
    pub fn read_sensors(&mut self, cache: bool) -> Result<HashMap<String, f64>, DeviceError> {
        let mut readings = HashMap::new();
        for sensor in &mut self.sensors {
            let value = sensor.read(cache).map_err(|error| DeviceError::Read {
                name: sensor.name().to_string(),
                error,
            })?;
            readings.insert(sensor.name().to_string(), value);
        }
        Ok(readings)
    }

    /// Publish every entity's frozen discovery payload, retained, to its
    /// discovery topic: all sensors first, then all numbers.
    pub async fn send_discovery(&mut self) -> Result<(), DeviceError> {
        info!(
            "Sending discovery for {} sensors and {} numbers",
            self.sensors.len(),
            self.numbers.len()
        );

        for sensor in &self.sensors {
            let payload = serde_json::to_string(sensor.discovery())?;
            debug!("Discovery to {}: {}", sensor.discovery_topic(), payload);
            self.transport
                .publish(
                    sensor.discovery_topic(),
                    payload.as_bytes(),
                    true,
                    Qos::AtLeastOnce,
                )
                .await?;
        }

        for number in &self.numbers {
            let payload = serde_json::to_string(number.discovery())?;
            debug!("Discovery to {}: {}", number.discovery_topic(), payload);
            self.transport
                .publish(
                    number.discovery_topic(),
                    payload.as_bytes(),
                    true,
                    Qos::AtLeastOnce,
                )
                .await?;
        }

        Ok(())
    }
}
