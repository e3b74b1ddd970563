//! Geometric obstacle classification from aggregate depth camera frames.

mod classifier;
mod depth_feed;
mod depth_frame;
mod detection;

pub use classifier::ObstacleClassifier;
pub use depth_feed::forward_depth_frames;
pub use depth_frame::{DepthFrame, InvalidFrame};
pub use detection::{AvoidanceManeuver, ManeuverKind, ObstacleDetection, ObstacleSeverity};
