//! Bridge to the flight controller: link framing, command primitives and telemetry conversion.

mod autopilot_link;
mod autopilot_messages;
mod autopilot_state;
mod bridge;
mod command;
mod mode_mapping;
mod telemetry;

pub use autopilot_link::{AutopilotLink, LinkConnector, TcpConnector};
pub use autopilot_messages::{MessageKind, VehicleType};
pub use autopilot_state::AutopilotState;
pub use bridge::{AutopilotBridge, BridgeError};
pub use command::{AutopilotCommand, CommandTag, ParameterValue, RawCommand};
pub use telemetry::TelemetrySnapshot;

/// The slice of the bridge that mission execution and the supervisor depend on.
#[async_trait::async_trait]
pub trait Autopilot: Send + Sync {
    async fn get_telemetry(&self) -> Result<TelemetrySnapshot, BridgeError>;
    async fn goto(&self, latitude: f64, longitude: f64, altitude: f64) -> Result<(), BridgeError>;
    async fn set_mode(&self, mode: &str) -> Result<(), BridgeError>;
    async fn return_to_launch(&self) -> Result<(), BridgeError>;
}

#[async_trait::async_trait]
impl<C: LinkConnector> Autopilot for AutopilotBridge<C> {
    async fn get_telemetry(&self) -> Result<TelemetrySnapshot, BridgeError> {
        AutopilotBridge::get_telemetry(self).await
    }

    async fn goto(&self, latitude: f64, longitude: f64, altitude: f64) -> Result<(), BridgeError> {
        AutopilotBridge::goto(self, latitude, longitude, altitude).await
    }

    async fn set_mode(&self, mode: &str) -> Result<(), BridgeError> {
        AutopilotBridge::set_mode(self, mode).await
    }

    async fn return_to_launch(&self) -> Result<(), BridgeError> {
        AutopilotBridge::return_to_launch(self).await
    }
}
