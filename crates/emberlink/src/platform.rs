//! Host identification for device identity derivation.
//!
//! The hardware id feeds the stable device id, so it must not change across
//! restarts. On Linux the machine id fits that contract; embedders on other
//! targets can bypass this module entirely via `Device::with_hardware_id`.

use std::fmt::Write;
use std::path::Path;

const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("no machine id source available: {0}")]
    Unavailable(#[source] std::io::Error),

    #[error("machine id is not valid hex: {0:?}")]
    Malformed(String),
}

/// Retrieve the hardware-unique id bytes for this host.
///
/// Reads the systemd machine id (falling back to the dbus location) and
/// decodes it to raw bytes. Fails when neither file is readable; callers
/// treat that as fatal.
pub fn hardware_id() -> Result<Vec<u8>, PlatformError> {
    let mut last_err = None;
    for path in MACHINE_ID_PATHS {
        match std::fs::read_to_string(Path::new(path)) {
            Ok(contents) => return decode_hex(contents.trim()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(PlatformError::Unavailable(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no machine id path")
    })))
}

/// Platform/manufacturer string for the discovery device descriptor.
pub fn manufacturer() -> &'static str {
    std::env::consts::OS
}

/// Hardware model string for the discovery device descriptor.
pub fn machine() -> &'static str {
    std::env::consts::ARCH
}

/// Firmware/software version string for the discovery device descriptor.
pub fn firmware_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Hex-encode bytes, lowercase without separators.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

fn decode_hex(s: &str) -> Result<Vec<u8>, PlatformError> {
    if s.is_empty() || s.len() % 2 != 0 {
        return Err(PlatformError::Malformed(s.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| PlatformError::Malformed(s.to_string()))
        })
        .collect()
}
