use super::depth_frame::DepthFrame;
use super::detection::{AvoidanceManeuver, ManeuverKind, ObstacleDetection, ObstacleSeverity};
use crate::config::EdgeConfig;
use crate::{debug, info, warn};

/// Threshold-based obstacle detection and maneuver selection. Pure: no state between frames.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleClassifier {
    detection_range: f64,
    minimum_clearance: f64,
}

impl ObstacleClassifier {
    /// Upper bounds of the severity bands as fractions of the detection range.
    const CRITICAL_RATIO: f64 = 0.2;
    const HIGH_RATIO: f64 = 0.4;
    const MEDIUM_RATIO: f64 = 0.6;
    const LOW_RATIO: f64 = 0.8;

    const CLIMB_MAGNITUDE_M: f64 = 5.0;
    const LATERAL_MAGNITUDE_M: f64 = 3.0;
    const HOLD_DURATION_S: f64 = 2.0;
    const CLIMB_DURATION_S: f64 = 3.0;
    const LATERAL_DURATION_S: f64 = 2.5;

    const PRIORITY_CRITICAL: u8 = 10;
    const PRIORITY_HIGH: u8 = 8;
    const PRIORITY_MEDIUM: u8 = 5;
    const PRIORITY_LOW: u8 = 2;

    /// Obstacles within this many degrees of straight ahead are climbed over.
    const BEARING_DEAD_ZONE_DEG: f64 = 15.0;
    const HEIGHT_TO_WIDTH: f64 = 0.75;

    pub fn new(detection_range: f64, minimum_clearance: f64) -> Self {
        Self { detection_range, minimum_clearance }
    }

    pub fn from_config(config: &EdgeConfig) -> Self {
        Self::new(config.obstacle_detection_range(), config.minimum_clearance())
    }

    /// Detections in `frame`, nearest first. Aggregate frames yield at most one.
    pub fn process_depth_frame(&self, frame: &DepthFrame) -> Vec<ObstacleDetection> {
        let min = frame.min_distance();
        if min <= 0.0 {
            debug!("Depth frame has no valid readings (min_distance={min:.2})");
            return Vec::new();
        }
        if min > self.detection_range {
            debug!(
                "No obstacles within detection range (min_distance={min:.2}, range={:.2})",
                self.detection_range
            );
            return Vec::new();
        }

        let severity = self.classify_severity(min);
        if severity == ObstacleSeverity::None {
            return Vec::new();
        }
        let width = Self::estimate_width(frame);
        let detection = ObstacleDetection {
            distance_meters: min,
            // aggregate frames carry no per-pixel data, the obstacle is assumed centered
            bearing_degrees: 0.0,
            severity,
            width_meters: width,
            height_meters: width * Self::HEIGHT_TO_WIDTH,
        };
        info!(
            "Obstacle detected: distance={:.2}m, bearing={:.1} deg, severity={severity}",
            detection.distance_meters, detection.bearing_degrees
        );
        vec![detection]
    }

    /// Maneuver for the nearest detection, or `None` if it is beyond the minimum clearance.
    pub fn compute_avoidance(&self, detections: &[ObstacleDetection]) -> Option<AvoidanceManeuver> {
        let nearest = detections
            .iter()
            .min_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters))?;
        if nearest.severity == ObstacleSeverity::None {
            return None;
        }
        if nearest.distance_meters >= self.minimum_clearance {
            debug!(
                "Obstacle at {:.2}m is beyond minimum clearance ({:.2}m), no avoidance needed",
                nearest.distance_meters, self.minimum_clearance
            );
            return None;
        }
        let maneuver = Self::select_maneuver(nearest);
        warn!(
            "Avoidance maneuver selected: type={}, magnitude={:.1}m, priority={}",
            maneuver.kind, maneuver.magnitude_meters, maneuver.priority
        );
        Some(maneuver)
    }

    pub fn classify_severity(&self, distance: f64) -> ObstacleSeverity {
        if self.detection_range <= 0.0 {
            return ObstacleSeverity::None;
        }
        let ratio = distance / self.detection_range;
        if ratio <= Self::CRITICAL_RATIO {
            ObstacleSeverity::Critical
        } else if ratio <= Self::HIGH_RATIO {
            ObstacleSeverity::High
        } else if ratio <= Self::MEDIUM_RATIO {
            ObstacleSeverity::Medium
        } else if ratio <= Self::LOW_RATIO {
            ObstacleSeverity::Low
        } else {
            ObstacleSeverity::None
        }
    }

    pub fn select_maneuver(detection: &ObstacleDetection) -> AvoidanceManeuver {
        match detection.severity {
            ObstacleSeverity::Critical => AvoidanceManeuver {
                kind: ManeuverKind::Hold,
                magnitude_meters: 0.0,
                duration_seconds: Self::HOLD_DURATION_S,
                priority: Self::PRIORITY_CRITICAL,
            },
            ObstacleSeverity::High => AvoidanceManeuver {
                kind: ManeuverKind::Climb,
                magnitude_meters: Self::CLIMB_MAGNITUDE_M,
                duration_seconds: Self::CLIMB_DURATION_S,
                priority: Self::PRIORITY_HIGH,
            },
            ObstacleSeverity::Medium | ObstacleSeverity::Low | ObstacleSeverity::None => {
                AvoidanceManeuver {
                    kind: Self::lateral_direction(detection.bearing_degrees),
                    magnitude_meters: Self::LATERAL_MAGNITUDE_M,
                    duration_seconds: Self::LATERAL_DURATION_S,
                    priority: if detection.severity == ObstacleSeverity::Medium {
                        Self::PRIORITY_MEDIUM
                    } else {
                        Self::PRIORITY_LOW
                    },
                }
            }
        }
    }

    /// Moves away from the obstacle side; inside the dead zone (inclusive) it climbs instead.
    pub fn lateral_direction(bearing_degrees: f64) -> ManeuverKind {
        if bearing_degrees > Self::BEARING_DEAD_ZONE_DEG {
            ManeuverKind::LateralLeft
        } else if bearing_degrees < -Self::BEARING_DEAD_ZONE_DEG {
            ManeuverKind::LateralRight
        } else {
            ManeuverKind::Climb
        }
    }

    fn estimate_width(frame: &DepthFrame) -> f64 {
        let max = frame.max_distance();
        if max <= 0.0 {
            return 1.0;
        }
        let coverage = 1.0 - (max - frame.min_distance()) / max;
        (coverage * frame.min_distance() * 0.5).max(0.5)
    }
}
