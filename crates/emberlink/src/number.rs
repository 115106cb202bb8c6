use std::fmt;

use crate::discovery::DiscoveryPayload;
use crate::sensor::ReadFn;

/// A named, read-only numeric data source.
///
/// Unlike a `Sensor` it keeps no history: every publish cycle reads the
/// current value. Registered with a `Device` exactly once before use.
pub struct NumericControl {
    name: String,
    sanitized_name: String,
    read_fn: ReadFn,
    pub(crate) precision: u32,
    /// `{device_name}_{sanitized_name}`, set at registration
    pub(crate) device_qualified_name: String,
    pub(crate) discovery_topic: String,
    pub(crate) discovery: DiscoveryPayload,
}

impl fmt::Debug for NumericControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericControl")
            .field("name", &self.name)
            .field("precision", &self.precision)
            .finish_non_exhaustive()
    }
}

impl NumericControl {
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
        }
    }

    /// Decimal places for the hub-side rounding template.
    #[must_use]
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.discovery.unit_of_measurement = Some(unit.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

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

    /// Invoke the wrapped read function. Failures propagate uncaught.
    pub fn read(&mut self) -> anyhow::Result<f64> {
        (self.read_fn)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_current_value() {
        let mut control = NumericControl::new("Publish Interval", Box::new(|| Ok(30.0)));
        assert_eq!(control.read().unwrap(), 30.0);
        assert_eq!(control.sanitized_name(), "Publish_Interval");
    }

    #[test]
    fn test_read_error_propagates() {
        let mut control = NumericControl::new("Broken", Box::new(|| anyhow::bail!("nvram gone")));
        assert!(control.read().is_err());
    }
}
