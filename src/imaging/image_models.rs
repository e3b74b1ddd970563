use crate::autopilot::TelemetrySnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// Where and when an image was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub drone_id: String,
    pub mission_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Degrees in `[0, 360]`.
    pub heading: f64,
    pub capture_time: DateTime<Utc>,
}

impl ImageMetadata {
    pub fn from_telemetry(
        drone_id: &str,
        mission_id: &str,
        telemetry: &TelemetrySnapshot,
        capture_time: DateTime<Utc>,
    ) -> Self {
        Self {
            drone_id: drone_id.to_string(),
            mission_id: mission_id.to_string(),
            latitude: telemetry.latitude(),
            longitude: telemetry.longitude(),
            altitude: telemetry.altitude(),
            heading: telemetry.heading().clamp(0.0, 360.0),
            capture_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedFrame {
    pub frame_id: String,
    pub image_key: String,
    pub metadata: ImageMetadata,
    pub size_bytes: u64,
    pub compression_quality: u8,
}

/// A frame waiting for its upload signal to go out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRequest {
    pub(super) frame_id: String,
    pub(super) image_key: String,
    pub(super) metadata: ImageMetadata,
    pub(super) status: UploadStatus,
    pub(super) retry_count: u8,
}

impl UploadRequest {
    pub(super) fn pending(frame: &CapturedFrame) -> Self {
        Self {
            frame_id: frame.frame_id.clone(),
            image_key: frame.image_key.clone(),
            metadata: frame.metadata.clone(),
            status: UploadStatus::Pending,
            retry_count: 0,
        }
    }

    pub fn frame_id(&self) -> &str { &self.frame_id }
    pub fn image_key(&self) -> &str { &self.image_key }
    pub fn metadata(&self) -> &ImageMetadata { &self.metadata }
    pub fn status(&self) -> UploadStatus { self.status }
    pub fn retry_count(&self) -> u8 { self.retry_count }
}
