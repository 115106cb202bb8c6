use serde::Deserialize;
use serde::Serialize;

const DEFAULT_LEVEL: &str = "warning";
const DEFAULT_LOGGER: &str = "Device Log";

/// A structured log line published to the device's log topic.
///
/// Serialization exposes exactly `message`, `level` and `logger`, matching
/// what Home Assistant's system log integration expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub level: String,
    pub logger: String,
}

impl LogEntry {
    /// A log entry with the default level ("warning") and logger tag.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: DEFAULT_LEVEL.to_string(),
            logger: DEFAULT_LOGGER.to_string(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = logger.into();
        self
    }
}

/// A raw log record handed to `Device::publish_logs`.
///
/// Explicit variants replace inspecting the runtime type of list elements:
/// callers state up front whether a record is text, undecoded bytes, or an
/// already-structured entry.
#[derive(Debug, Clone)]
pub enum LogRecord {
    Text(String),
    Bytes(Vec<u8>),
    Entry(LogEntry),
}

impl From<&str> for LogRecord {
    fn from(s: &str) -> Self {
        LogRecord::Text(s.to_string())
    }
}

impl From<String> for LogRecord {
    fn from(s: String) -> Self {
        LogRecord::Text(s)
    }
}

impl From<Vec<u8>> for LogRecord {
    fn from(b: Vec<u8>) -> Self {
        LogRecord::Bytes(b)
    }
}

impl From<LogEntry> for LogRecord {
    fn from(e: LogEntry) -> Self {
        LogRecord::Entry(e)
    }
}

impl TryFrom<LogRecord> for LogEntry {
    type Error = std::string::FromUtf8Error;

    fn try_from(record: LogRecord) -> Result<Self, Self::Error> {
        match record {
            LogRecord::Text(s) => Ok(LogEntry::new(s)),
            LogRecord::Bytes(b) => Ok(LogEntry::new(String::from_utf8(b)?)),
            LogRecord::Entry(e) => Ok(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let entry = LogEntry::new("sensor saturated");
        assert_eq!(entry.level, "warning");
        assert_eq!(entry.logger, "Device Log");
    }

    #[test]
    fn test_serialization_shape() {
        let entry = LogEntry::new("boot complete")
            .with_level("info")
            .with_logger("startup");
        let json = serde_json::to_value(&entry).unwrap();

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(json["message"], "boot complete");
        assert_eq!(json["level"], "info");
        assert_eq!(json["logger"], "startup");
    }

    #[test]
    fn test_record_conversions() {
        let from_text = LogEntry::try_from(LogRecord::from("hello")).unwrap();
        assert_eq!(from_text.message, "hello");

        let from_bytes = LogEntry::try_from(LogRecord::from(b"bytes".to_vec())).unwrap();
        assert_eq!(from_bytes.message, "bytes");

        let structured = LogEntry::new("x").with_level("error");
        let from_entry = LogEntry::try_from(LogRecord::from(structured.clone())).unwrap();
        assert_eq!(from_entry, structured);
    }

    #[test]
    fn test_invalid_utf8_bytes_rejected() {
        let record = LogRecord::Bytes(vec![0xff, 0xfe, 0xfd]);
        assert!(LogEntry::try_from(record).is_err());
    }
}
