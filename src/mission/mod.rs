//! Waypoint sequencing for cloud-planned mission segments.

mod executor;
mod executor_state;
mod geo;
mod progress;
mod waypoint;

pub use executor::{ExecutorError, MissionExecutor};
pub use executor_state::ExecutorState;
pub use geo::haversine_distance;
pub use progress::WaypointProgress;
pub use waypoint::{MissionSegment, Waypoint, WaypointError};

#[cfg(test)]
mod tests;
