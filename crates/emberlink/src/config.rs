use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_secs() -> u64 {
    30
}

/// Top-level agent configuration, loaded once at startup from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Identity of the publishing device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Display name; may contain spaces
    pub name: String,

    /// Hardware model string, first component of the device id
    pub model: String,

    /// Discovery prefix shared with the hub (default: "homeassistant")
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,

    /// Cap on each sensor's reading cache; absent means unbounded
    pub sensor_cache_limit: Option<usize>,
}

/// Broker connection settings for the shipped MQTT transport.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address
    pub broker: String,

    /// MQTT broker port
    pub port: u16,

    /// MQTT client ID (default: "emberlink-{hostname}")
    pub client_id: Option<String>,

    /// Optional username for authentication
    pub username: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,
}

impl MqttConfig {
    /// The configured client id, or one derived from the hostname.
    pub fn effective_client_id(&self) -> String {
        if let Some(id) = &self.client_id {
            return id.clone();
        }
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "device".to_string());
        format!("emberlink-{}", host)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// Seconds between publish cycles in the agent loop
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [device]
            name = "Greenhouse Node"
            model = "gw-01"

            [mqtt]
            broker = "localhost"
            port = 1883
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.device.name, "Greenhouse Node");
        assert_eq!(config.device.discovery_prefix, "homeassistant");
        assert_eq!(config.device.sensor_cache_limit, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.publish.interval_secs, 30);
        assert!(config.mqtt.username.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [device]
            name = "Greenhouse Node"
            model = "gw-01"
            discovery_prefix = "ha"
            sensor_cache_limit = 360

            [mqtt]
            broker = "broker.local"
            port = 8883
            client_id = "greenhouse"
            username = "u"
            password = "p"

            [logging]
            level = "debug"

            [publish]
            interval_secs = 5
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.device.discovery_prefix, "ha");
        assert_eq!(config.device.sensor_cache_limit, Some(360));
        assert_eq!(config.mqtt.effective_client_id(), "greenhouse");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.publish.interval_secs, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[device]\nname = \"n\"\nmodel = \"m\"\n\n[mqtt]\nbroker = \"localhost\"\nport = 1883"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.device.model, "m");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/emberlink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn test_default_client_id_uses_hostname() {
        let config = MqttConfig {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: None,
            username: None,
            password: None,
        };
        assert!(config.effective_client_id().starts_with("emberlink-"));
    }
}
