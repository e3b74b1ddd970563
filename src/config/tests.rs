use super::{ConfigError, ConnectivityMode, EdgeConfig};
use crate::logger::LogLevel;
use std::collections::HashMap;
use std::time::Duration;

fn load(vars: &[(&str, &str)]) -> Result<EdgeConfig, ConfigError> {
    let env: HashMap<String, String> =
        vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    EdgeConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn test_defaults_with_only_drone_id() {
    let config = load(&[("DRONE_DRONE_ID", "sar-07")]).unwrap();
    assert_eq!(config.drone_id(), "sar-07");
    assert_eq!(config.mqtt_endpoint(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.connectivity_mode(), &ConnectivityMode::Mosquitto);
    assert_eq!(config.mavlink_connection(), "tcp:127.0.0.1:5760");
    assert_eq!(config.mavlink_baud_rate(), 57600);
    assert!((config.obstacle_detection_range() - 10.0).abs() < f64::EPSILON);
    assert!((config.minimum_clearance() - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.image_capture_interval(), Duration::from_secs(5));
    assert_eq!(config.telemetry_interval(), Duration::from_secs(2));
    assert_eq!(
        config.fail_safe_thresholds(),
        (Duration::from_secs(10), Duration::from_secs(30), Duration::from_secs(120))
    );
    assert_eq!(config.log_level(), LogLevel::Info);
}

#[test]
fn test_missing_or_blank_drone_id_is_rejected() {
    assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DRONE_ID"));
    assert_eq!(load(&[("DRONE_DRONE_ID", "   ")]).unwrap_err(), ConfigError::Missing("DRONE_ID"));
}

#[test]
fn test_aws_iot_requires_all_certificates() {
    let err = load(&[
        ("DRONE_DRONE_ID", "d1"),
        ("DRONE_CONNECTIVITY_MODE", "AWS_IOT"),
        ("DRONE_CERTIFICATE_PATH", "/certs/device.pem"),
        ("DRONE_PRIVATE_KEY_PATH", "/certs/private.key"),
    ])
    .unwrap_err();
    assert_eq!(err, ConfigError::Missing("ROOT_CA_PATH"));

    let config = load(&[
        ("DRONE_DRONE_ID", "d1"),
        ("DRONE_CONNECTIVITY_MODE", "aws_iot"),
        ("DRONE_CERTIFICATE_PATH", "/certs/device.pem"),
        ("DRONE_PRIVATE_KEY_PATH", "/certs/private.key"),
        ("DRONE_ROOT_CA_PATH", "/certs/root.pem"),
    ])
    .unwrap();
    match config.connectivity_mode() {
        ConnectivityMode::AwsIot(certs) => {
            assert_eq!(certs.root_ca_path.to_str(), Some("/certs/root.pem"));
        }
        ConnectivityMode::Mosquitto => panic!("expected aws_iot mode"),
    }
}

#[test]
fn test_unknown_connectivity_mode() {
    let err = load(&[("DRONE_DRONE_ID", "d1"), ("DRONE_CONNECTIVITY_MODE", "carrier_pigeon")])
        .unwrap_err();
    assert_eq!(err, ConfigError::UnknownMode(String::from("carrier_pigeon")));
}

#[test]
fn test_range_checks() {
    let out_of_range = [
        ("DRONE_OBSTACLE_DETECTION_RANGE_METERS", "0.5"),
        ("DRONE_OBSTACLE_DETECTION_RANGE_METERS", "NaN"),
        ("DRONE_MINIMUM_CLEARANCE_METERS", "11"),
        ("DRONE_IMAGE_CAPTURE_INTERVAL_SECONDS", "0"),
        ("DRONE_TELEMETRY_REPORT_INTERVAL_SECONDS", "31"),
        ("DRONE_DEGRADED_THRESHOLD_SECONDS", "4"),
        ("DRONE_HOLDING_THRESHOLD_SECONDS", "121"),
        ("DRONE_RETURN_THRESHOLD_SECONDS", "601"),
        ("DRONE_MQTT_PORT", "0"),
    ];
    for (key, value) in out_of_range {
        let result = load(&[("DRONE_DRONE_ID", "d1"), (key, value)]);
        assert!(
            matches!(result, Err(ConfigError::OutOfRange { .. })),
            "{key}={value} should be out of range, got {result:?}"
        );
    }
    let malformed = load(&[("DRONE_DRONE_ID", "d1"), ("DRONE_MQTT_PORT", "eighty")]);
    assert!(matches!(malformed, Err(ConfigError::Malformed { key: "MQTT_PORT", .. })));
}

#[test]
fn test_threshold_ordering() {
    let err = load(&[
        ("DRONE_DRONE_ID", "d1"),
        ("DRONE_DEGRADED_THRESHOLD_SECONDS", "40"),
        ("DRONE_HOLDING_THRESHOLD_SECONDS", "40"),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        ConfigError::NotAbove {
            key: "HOLDING_THRESHOLD_SECONDS",
            lower_key: "DEGRADED_THRESHOLD_SECONDS"
        }
    );

    let err = load(&[
        ("DRONE_DRONE_ID", "d1"),
        ("DRONE_HOLDING_THRESHOLD_SECONDS", "90"),
        ("DRONE_RETURN_THRESHOLD_SECONDS", "60"),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::NotAbove { key: "RETURN_THRESHOLD_SECONDS", .. }));
}

#[test]
fn test_log_level_validation() {
    let config = load(&[("DRONE_DRONE_ID", "d1"), ("DRONE_LOG_LEVEL", "warning")]).unwrap();
    assert_eq!(config.log_level(), LogLevel::Warning);
    let err = load(&[("DRONE_DRONE_ID", "d1"), ("DRONE_LOG_LEVEL", "TRACE")]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
}
