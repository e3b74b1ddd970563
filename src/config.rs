use crate::logger::LogLevel;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by every environment variable the edge tier reads.
const ENV_PREFIX: &str = "DRONE_";

/// Paths to the mutual-TLS material required by the managed IoT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsCertificates {
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
    pub root_ca_path: PathBuf,
}

/// How the drone reaches its cloud message broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityMode {
    /// Managed IoT broker, TLS with client certificates.
    AwsIot(TlsCertificates),
    /// Plain TCP broker, typically a local Mosquitto instance.
    Mosquitto,
}

/// Errors raised while reading the startup configuration. All of them are fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Malformed { key: &'static str, value: String },
    OutOfRange { key: &'static str, value: String, min: String, max: String },
    NotAbove { key: &'static str, lower_key: &'static str },
    UnknownMode(String),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{ENV_PREFIX}{key} is required"),
            ConfigError::Malformed { key, value } => {
                write!(f, "{ENV_PREFIX}{key} has malformed value '{value}'")
            }
            ConfigError::OutOfRange { key, value, min, max } => {
                write!(f, "{ENV_PREFIX}{key}={value} is outside [{min}, {max}]")
            }
            ConfigError::NotAbove { key, lower_key } => {
                write!(f, "{ENV_PREFIX}{key} must exceed {ENV_PREFIX}{lower_key}")
            }
            ConfigError::UnknownMode(mode) => {
                write!(f, "connectivity mode must be 'aws_iot' or 'mosquitto', got '{mode}'")
            }
            ConfigError::InvalidLogLevel(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Edge tier configuration, built once at startup and handed to every component constructor.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    drone_id: String,
    mqtt_endpoint: String,
    mqtt_port: u16,
    connectivity_mode: ConnectivityMode,
    mavlink_connection: String,
    mavlink_baud_rate: u32,
    obstacle_detection_range: f64,
    minimum_clearance: f64,
    image_capture_interval: u64,
    image_compression_quality: u8,
    telemetry_interval: u64,
    degraded_threshold: u64,
    holding_threshold: u64,
    return_threshold: u64,
    log_level: LogLevel,
}

impl EdgeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which receives the full
    /// (prefixed) variable name. Values are whitespace-trimmed and empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&str) -> Option<String> {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let drone_id = get("DRONE_ID").ok_or(ConfigError::Missing("DRONE_ID"))?;
        let mqtt_endpoint = get("MQTT_ENDPOINT").unwrap_or_else(|| String::from("localhost"));
        let mqtt_port = ranged(get("MQTT_PORT"), "MQTT_PORT", 1883u16, 1, u16::MAX)?;

        let connectivity_mode = match get("CONNECTIVITY_MODE").map(|m| m.to_lowercase()) {
            None => ConnectivityMode::Mosquitto,
            Some(mode) if mode == "mosquitto" => ConnectivityMode::Mosquitto,
            Some(mode) if mode == "aws_iot" => ConnectivityMode::AwsIot(TlsCertificates {
                certificate_path: get("CERTIFICATE_PATH")
                    .ok_or(ConfigError::Missing("CERTIFICATE_PATH"))?
                    .into(),
                private_key_path: get("PRIVATE_KEY_PATH")
                    .ok_or(ConfigError::Missing("PRIVATE_KEY_PATH"))?
                    .into(),
                root_ca_path: get("ROOT_CA_PATH").ok_or(ConfigError::Missing("ROOT_CA_PATH"))?.into(),
            }),
            Some(other) => return Err(ConfigError::UnknownMode(other)),
        };

        let mavlink_connection =
            get("MAVLINK_CONNECTION").unwrap_or_else(|| String::from("tcp:127.0.0.1:5760"));
        let mavlink_baud_rate =
            ranged(get("MAVLINK_BAUD_RATE"), "MAVLINK_BAUD_RATE", 57600u32, 1, u32::MAX)?;

        let obstacle_detection_range = ranged(
            get("OBSTACLE_DETECTION_RANGE_METERS"),
            "OBSTACLE_DETECTION_RANGE_METERS",
            10.0,
            1.0,
            50.0,
        )?;
        let minimum_clearance = ranged(
            get("MINIMUM_CLEARANCE_METERS"),
            "MINIMUM_CLEARANCE_METERS",
            2.0,
            0.5,
            10.0,
        )?;
        let image_capture_interval = ranged(
            get("IMAGE_CAPTURE_INTERVAL_SECONDS"),
            "IMAGE_CAPTURE_INTERVAL_SECONDS",
            5,
            1,
            60,
        )?;
        let image_compression_quality = ranged(
            get("IMAGE_COMPRESSION_QUALITY"),
            "IMAGE_COMPRESSION_QUALITY",
            85,
            1,
            100,
        )?;
        let telemetry_interval = ranged(
            get("TELEMETRY_REPORT_INTERVAL_SECONDS"),
            "TELEMETRY_REPORT_INTERVAL_SECONDS",
            2,
            1,
            30,
        )?;

        let degraded_threshold = ranged(
            get("DEGRADED_THRESHOLD_SECONDS"),
            "DEGRADED_THRESHOLD_SECONDS",
            10,
            5,
            60,
        )?;
        let holding_threshold = ranged(
            get("HOLDING_THRESHOLD_SECONDS"),
            "HOLDING_THRESHOLD_SECONDS",
            30,
            15,
            120,
        )?;
        let return_threshold = ranged(
            get("RETURN_THRESHOLD_SECONDS"),
            "RETURN_THRESHOLD_SECONDS",
            120,
            60,
            600,
        )?;
        if holding_threshold <= degraded_threshold {
            return Err(ConfigError::NotAbove {
                key: "HOLDING_THRESHOLD_SECONDS",
                lower_key: "DEGRADED_THRESHOLD_SECONDS",
            });
        }
        if return_threshold <= holding_threshold {
            return Err(ConfigError::NotAbove {
                key: "RETURN_THRESHOLD_SECONDS",
                lower_key: "HOLDING_THRESHOLD_SECONDS",
            });
        }

        let log_level = match get("LOG_LEVEL") {
            None => LogLevel::Info,
            Some(level) => {
                level.parse().map_err(|e: crate::logger::UnknownLogLevel| {
                    ConfigError::InvalidLogLevel(e.to_string())
                })?
            }
        };

        Ok(Self {
            drone_id,
            mqtt_endpoint,
            mqtt_port,
            connectivity_mode,
            mavlink_connection,
            mavlink_baud_rate,
            obstacle_detection_range,
            minimum_clearance,
            image_capture_interval,
            image_compression_quality,
            telemetry_interval,
            degraded_threshold,
            holding_threshold,
            return_threshold,
            log_level,
        })
    }

    pub fn drone_id(&self) -> &str { &self.drone_id }
    pub fn mqtt_endpoint(&self) -> &str { &self.mqtt_endpoint }
    pub fn mqtt_port(&self) -> u16 { self.mqtt_port }
    pub fn connectivity_mode(&self) -> &ConnectivityMode { &self.connectivity_mode }
    pub fn mavlink_connection(&self) -> &str { &self.mavlink_connection }
    pub fn mavlink_baud_rate(&self) -> u32 { self.mavlink_baud_rate }
    pub fn obstacle_detection_range(&self) -> f64 { self.obstacle_detection_range }
    pub fn minimum_clearance(&self) -> f64 { self.minimum_clearance }
    pub fn image_compression_quality(&self) -> u8 { self.image_compression_quality }
    pub fn log_level(&self) -> LogLevel { self.log_level }

    pub fn image_capture_interval(&self) -> Duration {
        Duration::from_secs(self.image_capture_interval)
    }

    pub fn telemetry_interval(&self) -> Duration { Duration::from_secs(self.telemetry_interval) }

    /// Disconnection thresholds as `(degraded, holding, return)`.
    pub fn fail_safe_thresholds(&self) -> (Duration, Duration, Duration) {
        (
            Duration::from_secs(self.degraded_threshold),
            Duration::from_secs(self.holding_threshold),
            Duration::from_secs(self.return_threshold),
        )
    }
}

#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn ranged<T>(raw: Option<String>, key: &'static str, default: T, min: T, max: T) -> Result<T, ConfigError>
where T: FromStr + PartialOrd + Display + Copy {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: T = raw.parse().map_err(|_| ConfigError::Malformed { key, value: raw.clone() })?;
    // written this way so NaN is rejected as well
    if !(value >= min && value <= max) {
        return Err(ConfigError::OutOfRange {
            key,
            value: raw,
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests;
