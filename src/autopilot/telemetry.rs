use super::autopilot_messages::{GlobalPositionInt, GpsRawInt, SysStatus};
use serde::Serialize;

const COORDINATE_SCALE: f64 = 1e-7;
const CENTI_SCALE: f64 = 100.0;
const MILLI_SCALE: f64 = 1000.0;

/// Telemetry read from the autopilot, converted to SI units and degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    latitude: f64,
    longitude: f64,
    /// Meters above home.
    altitude: f64,
    /// Degrees in `[0, 360]`.
    heading: f64,
    /// Meters per second, never negative.
    ground_speed: f64,
    /// Meters per second, as reported by the autopilot (positive down).
    vertical_speed: f64,
    battery_voltage: f64,
    battery_remaining: u8,
    gps_fix_type: u32,
    satellites_visible: u32,
}

impl TelemetrySnapshot {
    /// Combines one position, one system status and one GPS message into a snapshot.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_messages(pos: &GlobalPositionInt, sys: &SysStatus, gps: &GpsRawInt) -> Self {
        Self {
            latitude: f64::from(pos.lat) * COORDINATE_SCALE,
            longitude: f64::from(pos.lon) * COORDINATE_SCALE,
            altitude: f64::from(pos.relative_alt) / CENTI_SCALE,
            heading: (f64::from(pos.hdg) / CENTI_SCALE).clamp(0.0, 360.0),
            ground_speed: (f64::from(pos.vx) / CENTI_SCALE).max(0.0),
            vertical_speed: f64::from(pos.vz) / CENTI_SCALE,
            battery_voltage: f64::from(sys.voltage_battery) / MILLI_SCALE,
            battery_remaining: sys.battery_remaining.clamp(0, 100) as u8,
            gps_fix_type: gps.fix_type,
            satellites_visible: gps.satellites_visible,
        }
    }

    #[cfg(test)]
    pub fn at(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            heading: 0.0,
            ground_speed: 0.0,
            vertical_speed: 0.0,
            battery_voltage: 12.6,
            battery_remaining: 100,
            gps_fix_type: 3,
            satellites_visible: 12,
        }
    }

    pub fn latitude(&self) -> f64 { self.latitude }
    pub fn longitude(&self) -> f64 { self.longitude }
    pub fn altitude(&self) -> f64 { self.altitude }
    pub fn heading(&self) -> f64 { self.heading }
    pub fn ground_speed(&self) -> f64 { self.ground_speed }
    pub fn vertical_speed(&self) -> f64 { self.vertical_speed }
    pub fn battery_voltage(&self) -> f64 { self.battery_voltage }
    pub fn battery_remaining(&self) -> u8 { self.battery_remaining }
    pub fn gps_fix_type(&self) -> u32 { self.gps_fix_type }
    pub fn satellites_visible(&self) -> u32 { self.satellites_visible }
}
