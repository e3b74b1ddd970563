//! Store-and-forward channel to the cloud tier over MQTT.

mod broker_link;
mod cloud_messages;
mod mqtt_link;
mod store_forward;

pub use broker_link::{BrokerLink, ChannelError, LinkEvent};
pub use cloud_messages::{
    CommandMessage, CommandType, InboundCommand, MessageDirection, TelemetryMessage,
    UploadReadyMessage, command_filter, telemetry_topic, upload_topic,
};
pub use mqtt_link::MqttLink;
pub use store_forward::{StoreAndForward, topic_matches};

#[cfg(test)]
mod tests;
