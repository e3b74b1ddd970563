use super::broker_link::{BrokerLink, ChannelError, LinkEvent};
use super::cloud_messages::{
    CommandMessage, InboundCommand, UploadReadyMessage, command_filter, upload_topic,
};
use crate::imaging::{UploadRequest, UploadSignal};
use crate::{debug, error, event, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, PartialEq)]
struct OutboundMessage {
    topic: String,
    payload: Vec<u8>,
}

/// Cloud channel that keeps publishing while the broker is unreachable.
///
/// Outbound messages published without a connection go into a bounded FIFO buffer
/// (oldest dropped first) that is replayed in order on the next `Connected` event.
/// Inbound commands are decoded here and handed over through a bounded queue;
/// anything malformed is logged and dropped.
pub struct StoreAndForward<L: BrokerLink> {
    link: L,
    drone_id: String,
    command_filter: String,
    connected: bool,
    buffer: VecDeque<OutboundMessage>,
    commands: mpsc::Sender<InboundCommand>,
}

impl<L: BrokerLink> StoreAndForward<L> {
    pub const BUFFER_CAPACITY: usize = 1000;
    const COMMAND_QUEUE_CAPACITY: usize = 32;

    pub fn new(link: L, drone_id: &str) -> (Self, mpsc::Receiver<InboundCommand>) {
        let (commands, command_rx) = mpsc::channel(Self::COMMAND_QUEUE_CAPACITY);
        let channel = Self {
            link,
            drone_id: drone_id.to_string(),
            command_filter: command_filter(drone_id),
            connected: false,
            buffer: VecDeque::with_capacity(Self::BUFFER_CAPACITY),
            commands,
        };
        (channel, command_rx)
    }

    pub fn is_connected(&self) -> bool { self.connected }

    pub fn buffered_len(&self) -> usize { self.buffer.len() }

    pub fn drone_id(&self) -> &str { &self.drone_id }

    /// Sends right away when connected, otherwise (or if the send fails) buffers.
    pub async fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        if self.connected {
            match self.link.publish(topic, payload.clone()).await {
                Ok(()) => {
                    debug!("Published {} bytes to {topic}", payload.len());
                    return;
                }
                Err(e) => warn!("Publish to {topic} failed, buffering: {e}"),
            }
        }
        self.buffer_message(OutboundMessage { topic: topic.to_string(), payload });
    }

    pub async fn publish_json<T: Serialize + Sync>(
        &mut self,
        topic: &str,
        message: &T,
    ) -> Result<(), ChannelError> {
        let payload = serde_json::to_vec(message)?;
        self.publish(topic, payload).await;
        Ok(())
    }

    pub async fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.connected = true;
                info!("Cloud link connected");
                if let Err(e) = self.link.subscribe(&self.command_filter).await {
                    error!("Failed to subscribe to {}: {e}", self.command_filter);
                } else {
                    info!("Subscribed to commands on {}", self.command_filter);
                }
                self.drain().await;
            }
            LinkEvent::Disconnected => {
                if self.connected {
                    warn!("Cloud link disconnected");
                }
                self.connected = false;
            }
            LinkEvent::Message { topic, payload } => {
                event!("Inbound message on {topic} ({} bytes)", payload.len());
                self.route_inbound(&topic, &payload);
            }
        }
    }

    fn buffer_message(&mut self, message: OutboundMessage) {
        if self.buffer.len() >= Self::BUFFER_CAPACITY {
            if let Some(dropped) = self.buffer.pop_front() {
                warn!(
                    "Message buffer full ({}), dropping oldest message for {}",
                    Self::BUFFER_CAPACITY,
                    dropped.topic
                );
            }
        }
        debug!("Buffered message for {} (buffer_size={})", message.topic, self.buffer.len() + 1);
        self.buffer.push_back(message);
    }

    /// Replays the buffer in order. A failed send puts the message back at the head.
    async fn drain(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let total = self.buffer.len();
        info!("Draining {total} buffered messages");
        let mut sent = 0;
        while let Some(message) = self.buffer.pop_front() {
            if let Err(e) = self.link.publish(&message.topic, message.payload.clone()).await {
                warn!("Drain stopped after {sent}/{total} messages: {e}");
                self.buffer.push_front(message);
                return;
            }
            sent += 1;
        }
        info!("Drained {sent} buffered messages");
    }

    fn route_inbound(&self, topic: &str, payload: &[u8]) {
        if !topic_matches(&self.command_filter, topic) {
            debug!("Ignoring message on unsubscribed topic {topic}");
            return;
        }
        let message: CommandMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to parse command payload from topic {topic}: {e}");
                return;
            }
        };
        info!(
            "Received {} command {} on topic {topic}",
            message.command_type, message.message_id
        );
        let command = match InboundCommand::try_from(message) {
            Ok(command) => command,
            Err(e) => {
                error!("Rejected command payload from topic {topic}: {e}");
                return;
            }
        };
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                warn!("Command queue full, dropping {command:?}");
            }
            Err(TrySendError::Closed(_)) => warn!("Command queue closed, dropping command"),
        }
    }

    #[cfg(test)]
    pub(crate) fn buffered_topics(&self) -> Vec<&str> {
        self.buffer.iter().map(|m| m.topic.as_str()).collect()
    }
}

#[async_trait::async_trait]
impl<L: BrokerLink> UploadSignal for StoreAndForward<L> {
    /// Upload signals are never buffered: offline requests stay in the pipeline queue.
    async fn signal_upload(&mut self, request: &UploadRequest) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::LinkDown);
        }
        let message = UploadReadyMessage::for_request(request, chrono::Utc::now());
        let payload = serde_json::to_vec(&message)?;
        self.link.publish(&upload_topic(&self.drone_id), payload).await
    }
}

/// MQTT topic filter matching with `+` (one level) and `#` (this level and below).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut levels = topic.split('/');
    for pattern in filter.split('/') {
        match pattern {
            "#" => return true,
            "+" => {
                if levels.next().is_none() {
                    return false;
                }
            }
            exact => {
                if levels.next() != Some(exact) {
                    return false;
                }
            }
        }
    }
    levels.next().is_none()
}
