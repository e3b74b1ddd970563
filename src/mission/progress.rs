use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaypointProgress {
    pub segment_id: String,
    pub current_waypoint_index: usize,
    pub total_waypoints: usize,
    pub distance_to_next_meters: f64,
    pub estimated_time_remaining: Duration,
}

impl WaypointProgress {
    /// Rough per-waypoint flight time used for the remaining-time estimate.
    pub const SECONDS_PER_WAYPOINT: u64 = 30;

    pub fn remaining_waypoints(&self) -> usize {
        self.total_waypoints.saturating_sub(self.current_waypoint_index)
    }
}
