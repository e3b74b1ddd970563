use super::broker_link::{BrokerLink, ChannelError, LinkEvent};
use crate::config::{ConnectivityMode, EdgeConfig, TlsCertificates};
use crate::{debug, error, info, warn};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// MQTT 3.1.1 broker connection. The event loop runs in its own task and reports through [`LinkEvent`]s.
pub struct MqttLink {
    client: AsyncClient,
    shutdown: CancellationToken,
}

impl MqttLink {
    const KEEP_ALIVE: Duration = Duration::from_secs(60);
    const RECONNECT_DELAY: Duration = Duration::from_secs(5);
    const REQUEST_CAPACITY: usize = 64;
    const EVENT_CAPACITY: usize = 256;
    const QOS: QoS = QoS::AtLeastOnce;

    /// Builds the client from `config` and spawns the event loop task.
    pub fn start(config: &EdgeConfig) -> Result<(Self, mpsc::Receiver<LinkEvent>), ChannelError> {
        let options = Self::options(config)?;
        let (client, event_loop) = AsyncClient::new(options, Self::REQUEST_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(Self::EVENT_CAPACITY);
        let shutdown = CancellationToken::new();
        tokio::spawn(Self::drive(event_loop, event_tx, shutdown.clone()));
        info!(
            "Connecting to MQTT broker at {}:{} as drone-{}",
            config.mqtt_endpoint(),
            config.mqtt_port(),
            config.drone_id()
        );
        Ok((Self { client, shutdown }, event_rx))
    }

    fn options(config: &EdgeConfig) -> Result<MqttOptions, ChannelError> {
        let mut options = MqttOptions::new(
            format!("drone-{}", config.drone_id()),
            config.mqtt_endpoint(),
            config.mqtt_port(),
        );
        options.set_keep_alive(Self::KEEP_ALIVE);
        match config.connectivity_mode() {
            ConnectivityMode::AwsIot(certificates) => {
                options.set_transport(Transport::Tls(Self::tls(certificates)?));
                info!("MQTT transport: mutual TLS");
            }
            ConnectivityMode::Mosquitto => debug!("MQTT transport: plaintext"),
        }
        Ok(options)
    }

    fn tls(certificates: &TlsCertificates) -> Result<TlsConfiguration, ChannelError> {
        let ca = read_pem(&certificates.root_ca_path)?;
        let certificate = read_pem(&certificates.certificate_path)?;
        let key = read_pem(&certificates.private_key_path)?;
        Ok(TlsConfiguration::Simple { ca, alpn: None, client_auth: Some((certificate, key)) })
    }

    async fn drive(
        mut event_loop: EventLoop,
        events: mpsc::Sender<LinkEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            let polled = tokio::select! {
                () = shutdown.cancelled() => break,
                polled = event_loop.poll() => polled,
            };
            let event = match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker");
                        LinkEvent::Connected
                    } else {
                        warn!("MQTT broker refused connection: {:?}", ack.code);
                        continue;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => LinkEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                },
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("MQTT connection lost: {e}");
                    if events.send(LinkEvent::Disconnected).await.is_err() {
                        break;
                    }
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(Self::RECONNECT_DELAY) => continue,
                    }
                }
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
        debug!("MQTT event loop stopped");
    }

    /// Queues a DISCONNECT; the event loop task ends once it is written.
    pub async fn shutdown(&self) {
        if let Err(e) = self.client.disconnect().await {
            error!("Failed to disconnect from MQTT broker: {e}");
            self.shutdown.cancel();
            return;
        }
        info!("Disconnected from MQTT broker");
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ChannelError> {
    std::fs::read(path)
        .map_err(|source| ChannelError::Certificate { path: path.to_path_buf(), source })
}

#[async_trait::async_trait]
impl BrokerLink for MqttLink {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.client.publish(topic, Self::QOS, false, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), ChannelError> {
        self.client.subscribe(filter, Self::QOS).await?;
        Ok(())
    }
}
