use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reasons a waypoint or segment is rejected on receipt.
#[derive(Debug, Clone, PartialEq)]
pub enum WaypointError {
    NegativeAltitude(f64),
    SpeedOutOfRange(f64),
    NegativeLoiter(f64),
    LoiterOutOfRange(f64),
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

impl std::fmt::Display for WaypointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaypointError::NegativeAltitude(alt) => write!(f, "altitude {alt} m is negative"),
            WaypointError::SpeedOutOfRange(speed) => {
                write!(
                    f,
                    "speed {speed} m/s outside [{}, {}]",
                    Waypoint::MIN_SPEED,
                    Waypoint::MAX_SPEED
                )
            }
            WaypointError::NegativeLoiter(secs) => write!(f, "loiter time {secs} s is negative"),
            WaypointError::LoiterOutOfRange(secs) => {
                write!(f, "loiter time {secs} s exceeds {} s", Waypoint::MAX_LOITER_SECONDS)
            }
            WaypointError::InvalidCoordinate { latitude, longitude } => {
                write!(f, "coordinate ({latitude}, {longitude}) is not a valid position")
            }
        }
    }
}

impl std::error::Error for WaypointError {}

/// A single navigation target of a mission segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WaypointDef")]
pub struct Waypoint {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    speed: f64,
    #[serde(rename = "loiter_time_seconds")]
    loiter_time: f64,
}

#[derive(Deserialize)]
struct WaypointDef {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    #[serde(default = "WaypointDef::default_speed")]
    speed: f64,
    #[serde(default)]
    loiter_time_seconds: f64,
}

impl WaypointDef {
    fn default_speed() -> f64 { Waypoint::DEFAULT_SPEED }
}

impl TryFrom<WaypointDef> for Waypoint {
    type Error = WaypointError;

    fn try_from(def: WaypointDef) -> Result<Self, Self::Error> {
        Waypoint::with_options(
            def.latitude,
            def.longitude,
            def.altitude,
            def.speed,
            def.loiter_time_seconds,
        )
    }
}

impl Waypoint {
    pub const DEFAULT_SPEED: f64 = 5.0;
    pub const MIN_SPEED: f64 = 0.5;
    pub const MAX_SPEED: f64 = 20.0;
    /// Longest loiter a single waypoint may ask for, one day.
    pub const MAX_LOITER_SECONDS: f64 = 86_400.0;

    /// Waypoint with default cruise speed and no loiter.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, WaypointError> {
        Self::with_options(latitude, longitude, altitude, Self::DEFAULT_SPEED, 0.0)
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn with_options(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        speed: f64,
        loiter_time: f64,
    ) -> Result<Self, WaypointError> {
        if !(latitude.is_finite() && longitude.is_finite()) {
            return Err(WaypointError::InvalidCoordinate { latitude, longitude });
        }
        if !(altitude >= 0.0) {
            return Err(WaypointError::NegativeAltitude(altitude));
        }
        if !(Self::MIN_SPEED..=Self::MAX_SPEED).contains(&speed) {
            return Err(WaypointError::SpeedOutOfRange(speed));
        }
        if !(loiter_time >= 0.0) {
            return Err(WaypointError::NegativeLoiter(loiter_time));
        }
        if loiter_time > Self::MAX_LOITER_SECONDS {
            return Err(WaypointError::LoiterOutOfRange(loiter_time));
        }
        Ok(Self { latitude, longitude, altitude, speed, loiter_time })
    }

    pub fn latitude(&self) -> f64 { self.latitude }
    pub fn longitude(&self) -> f64 { self.longitude }
    pub fn altitude(&self) -> f64 { self.altitude }
    pub fn speed(&self) -> f64 { self.speed }
    pub fn loiter_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.loiter_time)
    }
}

/// Ordered waypoints planned by the cloud for one drone. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSegment {
    pub segment_id: String,
    pub mission_id: String,
    pub waypoints: Vec<Waypoint>,
    #[serde(default = "MissionSegment::default_capture")]
    pub capture_images: bool,
}

impl MissionSegment {
    fn default_capture() -> bool { true }

    pub fn new(segment_id: &str, mission_id: &str, waypoints: Vec<Waypoint>) -> Arc<Self> {
        Arc::new(Self {
            segment_id: segment_id.to_string(),
            mission_id: mission_id.to_string(),
            waypoints,
            capture_images: true,
        })
    }
}
