use std::path::PathBuf;
use std::sync::Arc;

/// Events surfaced by the broker transport task.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

#[derive(Debug)]
pub enum ChannelError {
    /// The broker connection is not established.
    LinkDown,
    Client(rumqttc::ClientError),
    Encode(serde_json::Error),
    Certificate { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::LinkDown => write!(f, "broker link is down"),
            ChannelError::Client(e) => write!(f, "MQTT client error: {e}"),
            ChannelError::Encode(e) => write!(f, "failed to encode message: {e}"),
            ChannelError::Certificate { path, source } => {
                write!(f, "failed to read certificate {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::LinkDown => None,
            ChannelError::Client(e) => Some(e),
            ChannelError::Encode(e) => Some(e),
            ChannelError::Certificate { source, .. } => Some(source),
        }
    }
}

impl From<rumqttc::ClientError> for ChannelError {
    fn from(value: rumqttc::ClientError) -> Self { ChannelError::Client(value) }
}

impl From<serde_json::Error> for ChannelError {
    fn from(value: serde_json::Error) -> Self { ChannelError::Encode(value) }
}

/// Publish/subscribe primitives of a broker connection.
#[async_trait::async_trait]
pub trait BrokerLink: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError>;
    async fn subscribe(&self, filter: &str) -> Result<(), ChannelError>;
}

#[async_trait::async_trait]
impl<L: BrokerLink> BrokerLink for Arc<L> {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.as_ref().publish(topic, payload).await
    }

    async fn subscribe(&self, filter: &str) -> Result<(), ChannelError> {
        self.as_ref().subscribe(filter).await
    }
}
