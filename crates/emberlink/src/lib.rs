pub mod config;
mod device;
mod discovery;
mod logs;
mod number;
mod platform;
mod sensor;
mod topic;
pub mod transport;

pub use config::Config;
pub use config::ConfigError;
pub use config::DeviceConfig;
pub use config::MqttConfig;
pub use device::Device;
pub use device::DeviceError;
pub use discovery::DeviceDescriptor;
pub use discovery::DiscoveryPayload;
pub use logs::LogEntry;
pub use logs::LogRecord;
pub use number::NumericControl;
pub use platform::PlatformError;
pub use sensor::ReadFn;
pub use sensor::Sensor;
pub use sensor::SensorClass;
pub use topic::Component;
pub use transport::MqttTransport;
pub use transport::Qos;
pub use transport::Transport;
pub use transport::TransportError;
