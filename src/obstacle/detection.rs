use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObstacleSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObstacleDetection {
    pub distance_meters: f64,
    /// Degrees, positive to the right, in `[-180, 180]`.
    pub bearing_degrees: f64,
    pub severity: ObstacleSeverity,
    pub width_meters: f64,
    pub height_meters: f64,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    Hold,
    Climb,
    LateralLeft,
    LateralRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AvoidanceManeuver {
    pub kind: ManeuverKind,
    pub magnitude_meters: f64,
    pub duration_seconds: f64,
    /// 0 (lowest) to 10.
    pub priority: u8,
}
