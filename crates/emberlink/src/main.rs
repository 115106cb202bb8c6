use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use emberlink::Config;
use emberlink::Device;
use emberlink::LogEntry;
use emberlink::LogRecord;
use emberlink::MqttTransport;
use emberlink::NumericControl;
use emberlink::Sensor;
use emberlink::SensorClass;
use emberlink::Transport;

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse config file path from CLI or use default
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "emberlink.toml".to_string());

    let config = Config::from_file(&config_path)?;

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&config.logging.level))
        .init();

    tracing::info!("emberlink starting");
    tracing::info!("Loaded config from: {}", config_path);

    let mut transport = MqttTransport::new(&config.mqtt);
    transport.connect().await?;

    let mut device = Device::new(&config.device, transport)?;
    tracing::info!("Device id: {}", device.device_id());

    let limit = config.device.sensor_cache_limit;
    device.add_sensor(bounded(
        Sensor::new("Load Average", Box::new(read_load_average)).with_precision(2),
        limit,
    ))?;
    device.add_sensor(bounded(
        Sensor::new("Memory Available", Box::new(read_mem_available_mib))
            .with_precision(1)
            .with_unit("MiB"),
        limit,
    ))?;
    if Path::new(THERMAL_ZONE).exists() {
        device.add_sensor(bounded(
            Sensor::new("CPU Temperature", Box::new(read_cpu_temperature))
                .with_precision(1)
                .with_device_class(SensorClass::Temperature)
                .with_unit("°C"),
            limit,
        ))?;
    }

    let interval_secs = config.publish.interval_secs;
    device.add_number(
        NumericControl::new("Publish Interval", Box::new(move || Ok(interval_secs as f64)))
            .with_unit("s"),
    )?;

    device.send_discovery().await?;
    device
        .publish_logs([LogRecord::from(
            LogEntry::new("emberlink started").with_level("info"),
        )])
        .await?;

    tracing::info!("Publishing every {}s, press Ctrl+C to exit", interval_secs);

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = device.read_sensors(true) {
                    tracing::warn!("Sensor read failed: {}", e);
                }
                if let Err(e) = device.publish_sensors().await {
                    tracing::warn!("Sensor publish failed: {}", e);
                }
                if let Err(e) = device.publish_numbers().await {
                    tracing::warn!("Number publish failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    tracing::info!("emberlink shutdown complete");

    Ok(())
}

fn bounded(sensor: Sensor, limit: Option<usize>) -> Sensor {
    match limit {
        Some(l) => sensor.with_cache_limit(l),
        None => sensor,
    }
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

/// 1-minute load average from /proc/loadavg.
fn read_load_average() -> anyhow::Result<f64> {
    let contents = std::fs::read_to_string("/proc/loadavg")?;
    contents
        .split_whitespace()
        .next()
        .context("empty /proc/loadavg")?
        .parse()
        .context("malformed /proc/loadavg")
}

/// MemAvailable from /proc/meminfo, in MiB.
fn read_mem_available_mib() -> anyhow::Result<f64> {
    let contents = std::fs::read_to_string("/proc/meminfo")?;
    let kib: f64 = contents
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .context("MemAvailable not present in /proc/meminfo")?
        .trim()
        .trim_end_matches(" kB")
        .trim()
        .parse()
        .context("malformed MemAvailable line")?;
    Ok(kib / 1024.0)
}

/// Thermal zone 0 temperature in degrees Celsius.
fn read_cpu_temperature() -> anyhow::Result<f64> {
    let contents = std::fs::read_to_string(THERMAL_ZONE)?;
    let millidegrees: f64 = contents
        .trim()
        .parse()
        .context("malformed thermal zone reading")?;
    Ok(millidegrees / 1000.0)
}
