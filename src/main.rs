#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod autopilot;
mod cloud;
mod config;
mod fail_safe;
mod imaging;
mod keychain;
mod logger;
mod mission;
mod obstacle;
mod supervisor;
#[cfg(test)]
mod testing;

use crate::autopilot::{AutopilotBridge, TcpConnector};
use crate::cloud::MqttLink;
use crate::config::EdgeConfig;
use crate::keychain::Keychain;
use crate::obstacle::{DepthFrame, forward_depth_frames};
use crate::supervisor::Supervisor;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type EdgeSupervisor = Supervisor<AutopilotBridge<TcpConnector>, Arc<MqttLink>>;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let config = EdgeConfig::from_env().unwrap_or_else(|e| fatal!("Invalid configuration: {e}"));
    logger::set_level(config.log_level());
    info!(
        "Starting edge application (drone_id={}, mavlink={}, mqtt={}:{})",
        config.drone_id(),
        config.mavlink_connection(),
        config.mqtt_endpoint(),
        config.mqtt_port()
    );

    let shutdown = CancellationToken::new();
    let (keychain, mqtt, supervisor, depth_tx) = init(&config).await;
    tokio::spawn(forward_depth_frames(
        BufReader::new(tokio::io::stdin()),
        depth_tx,
        shutdown.clone(),
    ));
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    info!("Edge application started, entering main loop");
    supervisor.run(shutdown).await;

    info!("Shutting down edge application");
    mqtt.shutdown().await;
    keychain.autopilot().disconnect().await;
    info!("Edge application shut down complete");
}

async fn init(
    config: &EdgeConfig,
) -> (
    Keychain<AutopilotBridge<TcpConnector>>,
    Arc<MqttLink>,
    EdgeSupervisor,
    mpsc::Sender<DepthFrame>,
) {
    let connector = TcpConnector::parse(config.mavlink_connection(), config.mavlink_baud_rate())
        .unwrap_or_else(|e| fatal!("Unusable autopilot connection: {e}"));
    let bridge = Arc::new(AutopilotBridge::new(connector));
    info!("Connecting autopilot bridge");
    if let Err(e) = bridge.connect().await {
        fatal!("Autopilot connection failed: {e}");
    }
    let keychain = Keychain::new(bridge, config);

    info!("Connecting cloud connector");
    let (mqtt_link, link_events) =
        MqttLink::start(config).unwrap_or_else(|e| fatal!("Cloud connector setup failed: {e}"));
    let mqtt = Arc::new(mqtt_link);
    let (supervisor, depth_tx) =
        Supervisor::new(keychain.clone(), config, Arc::clone(&mqtt), link_events);
    (keychain, mqtt, supervisor, depth_tx)
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Could not install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Could not listen for Ctrl-C: {e}");
                return;
            }
        }
        () = terminate => {}
    }
    info!("Received shutdown signal");
    shutdown.cancel();
}
