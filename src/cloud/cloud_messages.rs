use crate::autopilot::TelemetrySnapshot;
use crate::imaging::UploadRequest;
use crate::mission::MissionSegment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    MissionSegment,
    Recall,
    Abort,
    UpdateConfig,
}

/// Command envelope received on `drone/{drone_id}/command/#`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub message_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub drone_id: String,
    pub direction: MessageDirection,
    pub command_type: CommandType,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// A decoded command, ready for the supervisor.
#[derive(Debug, Clone)]
pub enum InboundCommand {
    MissionSegment(Arc<MissionSegment>),
    Recall,
    Abort,
    UpdateConfig(Map<String, Value>),
}

impl TryFrom<CommandMessage> for InboundCommand {
    type Error = serde_json::Error;

    fn try_from(message: CommandMessage) -> Result<Self, Self::Error> {
        Ok(match message.command_type {
            CommandType::MissionSegment => {
                let segment: MissionSegment = serde_json::from_value(Value::Object(message.payload))?;
                InboundCommand::MissionSegment(Arc::new(segment))
            }
            CommandType::Recall => InboundCommand::Recall,
            CommandType::Abort => InboundCommand::Abort,
            CommandType::UpdateConfig => InboundCommand::UpdateConfig(message.payload),
        })
    }
}

/// Position report published on `drone/{drone_id}/telemetry/{report_type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub drone_id: String,
    pub direction: MessageDirection,
    pub report_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
    pub battery_remaining: u8,
    pub ground_speed: f64,
}

impl TelemetryMessage {
    pub const POSITION_REPORT: &'static str = "position";

    pub fn position(drone_id: &str, telemetry: &TelemetrySnapshot, now: DateTime<Utc>) -> Self {
        Self {
            message_id: format!("telem-{drone_id}-{}", now.timestamp()),
            timestamp: now,
            drone_id: drone_id.to_string(),
            direction: MessageDirection::Outbound,
            report_type: Self::POSITION_REPORT.to_string(),
            latitude: telemetry.latitude(),
            longitude: telemetry.longitude(),
            altitude: telemetry.altitude(),
            heading: telemetry.heading(),
            battery_remaining: telemetry.battery_remaining(),
            ground_speed: telemetry.ground_speed(),
        }
    }

    pub fn topic(&self) -> String { telemetry_topic(&self.drone_id, &self.report_type) }
}

/// Upload-ready signal for one captured image, published on `drone/{drone_id}/images/upload`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReadyMessage<'a> {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub drone_id: &'a str,
    pub direction: MessageDirection,
    pub frame_id: &'a str,
    pub image_key: &'a str,
    pub mission_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
    pub capture_time: DateTime<Utc>,
    pub retry_count: u8,
}

impl<'a> UploadReadyMessage<'a> {
    pub fn for_request(request: &'a UploadRequest, now: DateTime<Utc>) -> Self {
        let metadata = request.metadata();
        Self {
            message_id: format!("upload-{}", request.frame_id()),
            timestamp: now,
            drone_id: &metadata.drone_id,
            direction: MessageDirection::Outbound,
            frame_id: request.frame_id(),
            image_key: request.image_key(),
            mission_id: &metadata.mission_id,
            latitude: metadata.latitude,
            longitude: metadata.longitude,
            altitude: metadata.altitude,
            heading: metadata.heading,
            capture_time: metadata.capture_time,
            retry_count: request.retry_count(),
        }
    }
}

pub fn telemetry_topic(drone_id: &str, report_type: &str) -> String {
    format!("drone/{drone_id}/telemetry/{report_type}")
}

pub fn command_filter(drone_id: &str) -> String { format!("drone/{drone_id}/command/#") }

pub fn upload_topic(drone_id: &str) -> String { format!("drone/{drone_id}/images/upload") }
