use super::{
    autopilot_link::{AutopilotLink, LinkConnector},
    autopilot_messages::{
        CommandLong, DownlinkContent, Heartbeat, MessageKind, MissionItemInt, RequestDataStream,
        SetMode, UplinkContent, VehicleType,
    },
    autopilot_state::AutopilotState,
    command::AutopilotCommand,
    mode_mapping,
    telemetry::TelemetrySnapshot,
};
use crate::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, timeout_at};

/// Errors raised by the autopilot bridge.
#[derive(Debug)]
pub enum BridgeError {
    /// Operation needs a live link but the bridge is disconnected.
    NotConnected,
    /// No message of the given kind arrived in time.
    Timeout(MessageKind),
    Io(std::io::Error),
    Decode(prost::DecodeError),
    FrameTooLarge(usize),
    UnsupportedTransport(String),
    UnknownMode(String),
    UnknownCommand(String),
    MissingParameter { command: String, parameter: &'static str },
}

impl BridgeError {
    /// `true` if the link can no longer be used and the bridge dropped it.
    pub fn is_link_loss(&self) -> bool {
        matches!(self, BridgeError::Io(_) | BridgeError::Decode(_) | BridgeError::FrameTooLarge(_))
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::NotConnected => write!(f, "not connected to autopilot, call connect() first"),
            BridgeError::Timeout(kind) => write!(f, "timed out waiting for {kind}"),
            BridgeError::Io(e) => write!(f, "autopilot link failed: {e}"),
            BridgeError::Decode(e) => write!(f, "undecodable autopilot frame: {e}"),
            BridgeError::FrameTooLarge(len) => write!(f, "autopilot frame of {len} bytes exceeds limit"),
            BridgeError::UnsupportedTransport(conn) => {
                write!(f, "unsupported autopilot connection string '{conn}'")
            }
            BridgeError::UnknownMode(mode) => write!(f, "unknown flight mode: {mode}"),
            BridgeError::UnknownCommand(cmd) => write!(f, "unknown command type: {cmd}"),
            BridgeError::MissingParameter { command, parameter } => {
                write!(f, "{command} command requires '{parameter}' parameter")
            }
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(value: std::io::Error) -> Self { BridgeError::Io(value) }
}

impl From<prost::DecodeError> for BridgeError {
    fn from(value: prost::DecodeError) -> Self { BridgeError::Decode(value) }
}

/// Identity and motor state of the vehicle, learned from its heartbeats.
#[derive(Debug, Clone, Copy)]
struct VehicleInfo {
    system_id: u32,
    component_id: u32,
    vehicle_type: VehicleType,
    armed: bool,
}

impl VehicleInfo {
    const UNKNOWN: VehicleInfo = VehicleInfo {
        system_id: 1,
        component_id: 1,
        vehicle_type: VehicleType::Generic,
        armed: false,
    };

    fn absorb(&mut self, heartbeat: &Heartbeat) {
        self.system_id = heartbeat.system_id;
        self.component_id = heartbeat.component_id;
        self.vehicle_type = heartbeat.vehicle_type();
        self.armed = heartbeat.armed;
    }
}

/// Owns the single link to the flight controller and exposes command and telemetry primitives.
pub struct AutopilotBridge<C: LinkConnector> {
    connector: C,
    link: Mutex<Option<AutopilotLink<C::Stream>>>,
    state: RwLock<AutopilotState>,
    vehicle: RwLock<VehicleInfo>,
}

impl<C: LinkConnector> AutopilotBridge<C> {
    const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);
    const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
    const DATA_STREAM_RATE_HZ: u32 = 4;
    const STREAM_EXTENDED_STATUS: u32 = 2;
    const STREAM_POSITION: u32 = 6;
    const CMD_NAV_WAYPOINT: u32 = 16;
    const CMD_NAV_TAKEOFF: u32 = 22;
    const CMD_COMPONENT_ARM_DISARM: u32 = 400;
    const FRAME_GLOBAL_RELATIVE_ALT_INT: u32 = 6;
    const COORDINATE_SCALE: f64 = 1e-7;

    pub fn new(connector: C) -> Self {
        Self {
            connector,
            link: Mutex::new(None),
            state: RwLock::new(AutopilotState::Disconnected),
            vehicle: RwLock::new(VehicleInfo::UNKNOWN),
        }
    }

    pub async fn state(&self) -> AutopilotState { *self.state.read().await }

    /// Opens the link, waits for the first heartbeat and requests the telemetry streams.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        let mut guard = self.link.lock().await;
        info!("Connecting to autopilot at {}", self.connector.describe());
        *self.state.write().await = AutopilotState::Connecting;

        match self.open_link().await {
            Ok(link) => {
                *guard = Some(link);
                *self.state.write().await = AutopilotState::Connected;
                let vehicle = *self.vehicle.read().await;
                info!(
                    "Connected to autopilot (system={}, component={}, type={:?})",
                    vehicle.system_id, vehicle.component_id, vehicle.vehicle_type
                );
                Ok(())
            }
            Err(e) => {
                *guard = None;
                *self.state.write().await = AutopilotState::Disconnected;
                error!("Failed to connect to autopilot at {}: {e}", self.connector.describe());
                Err(e)
            }
        }
    }

    async fn open_link(&self) -> Result<AutopilotLink<C::Stream>, BridgeError> {
        let mut link = AutopilotLink::new(self.connector.open().await?);
        info!("Waiting for heartbeat (timeout={}s)", Self::HEARTBEAT_TIMEOUT.as_secs());
        self.wait_for(&mut link, MessageKind::Heartbeat, Self::HEARTBEAT_TIMEOUT, |c| {
            matches!(c, DownlinkContent::Heartbeat(_)).then_some(())
        })
        .await?;

        let vehicle = *self.vehicle.read().await;
        for stream_id in [Self::STREAM_POSITION, Self::STREAM_EXTENDED_STATUS] {
            link.send(UplinkContent::RequestDataStream(RequestDataStream {
                target_system: vehicle.system_id,
                target_component: vehicle.component_id,
                stream_id,
                rate_hz: Self::DATA_STREAM_RATE_HZ,
                start: true,
            }))
            .await?;
        }
        info!("Requested data streams at {} Hz", Self::DATA_STREAM_RATE_HZ);
        Ok(link)
    }

    /// Releases the link. Never fails; the bridge always ends up `Disconnected`.
    pub async fn disconnect(&self) {
        let mut guard = self.link.lock().await;
        if let Some(mut link) = guard.take() {
            info!("Disconnecting from autopilot");
            if let Err(e) = link.shutdown().await {
                debug!("Ignoring error while closing autopilot link: {e}");
            }
        }
        *self.state.write().await = AutopilotState::Disconnected;
        info!("Disconnected from autopilot");
    }

    /// Reads one position, one system status and one GPS message, in that order.
    pub async fn get_telemetry(&self) -> Result<TelemetrySnapshot, BridgeError> {
        let mut guard = self.link.lock().await;
        self.require_connected().await?;
        let result = match guard.as_mut() {
            Some(link) => self.read_telemetry(link).await,
            None => Err(BridgeError::NotConnected),
        };
        self.settle(&mut guard, result).await
    }

    async fn read_telemetry(
        &self,
        link: &mut AutopilotLink<C::Stream>,
    ) -> Result<TelemetrySnapshot, BridgeError> {
        let pos = self
            .wait_for(link, MessageKind::GlobalPositionInt, Self::MESSAGE_TIMEOUT, |c| match c {
                DownlinkContent::GlobalPositionInt(p) => Some(*p),
                _ => None,
            })
            .await?;
        let sys = self
            .wait_for(link, MessageKind::SysStatus, Self::MESSAGE_TIMEOUT, |c| match c {
                DownlinkContent::SysStatus(s) => Some(*s),
                _ => None,
            })
            .await?;
        let gps = self
            .wait_for(link, MessageKind::GpsRawInt, Self::MESSAGE_TIMEOUT, |c| match c {
                DownlinkContent::GpsRawInt(g) => Some(*g),
                _ => None,
            })
            .await?;
        Ok(TelemetrySnapshot::from_messages(&pos, &sys, &gps))
    }

    pub async fn arm(&self) -> Result<(), BridgeError> {
        info!("Arming motors");
        self.command_motors(true).await?;
        *self.state.write().await = AutopilotState::Armed;
        info!("Motors armed");
        Ok(())
    }

    pub async fn disarm(&self) -> Result<(), BridgeError> {
        info!("Disarming motors");
        self.command_motors(false).await?;
        *self.state.write().await = AutopilotState::Connected;
        info!("Motors disarmed");
        Ok(())
    }

    /// Sends the arm/disarm command and blocks until a heartbeat reports the requested motor state.
    async fn command_motors(&self, armed: bool) -> Result<(), BridgeError> {
        let mut guard = self.link.lock().await;
        self.require_connected().await?;
        let vehicle = *self.vehicle.read().await;
        let command = CommandLong {
            target_system: vehicle.system_id,
            target_component: vehicle.component_id,
            command: Self::CMD_COMPONENT_ARM_DISARM,
            param1: if armed { 1.0 } else { 0.0 },
            ..Default::default()
        };
        let result = match guard.as_mut() {
            Some(link) => match link.send(UplinkContent::CommandLong(command)).await {
                Ok(()) => {
                    self.wait_for(
                        link,
                        MessageKind::ArmedConfirmation,
                        Self::HEARTBEAT_TIMEOUT,
                        |c| matches!(c, DownlinkContent::Heartbeat(hb) if hb.armed == armed).then_some(()),
                    )
                    .await
                }
                Err(e) => Err(e),
            },
            None => Err(BridgeError::NotConnected),
        };
        self.settle(&mut guard, result).await
    }

    /// Switches to the named flight mode using the vehicle's own mode table.
    pub async fn set_mode(&self, mode: &str) -> Result<(), BridgeError> {
        self.require_connected().await?;
        let vehicle = *self.vehicle.read().await;
        let mode_id = mode_mapping::mode_id(vehicle.vehicle_type, mode)
            .ok_or_else(|| BridgeError::UnknownMode(mode.to_string()))?;
        info!("Setting flight mode to {mode} (id={mode_id})");
        self.send(UplinkContent::SetMode(SetMode {
            target_system: vehicle.system_id,
            custom_mode: mode_id,
        }))
        .await
    }

    /// Sends a single guided waypoint. Does not wait for arrival.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn goto(&self, latitude: f64, longitude: f64, altitude: f64) -> Result<(), BridgeError> {
        self.require_connected().await?;
        info!("Navigating to lat={latitude:.7}, lon={longitude:.7}, alt={altitude:.1}");
        let vehicle = *self.vehicle.read().await;
        self.send(UplinkContent::MissionItemInt(MissionItemInt {
            target_system: vehicle.system_id,
            target_component: vehicle.component_id,
            seq: 0,
            frame: Self::FRAME_GLOBAL_RELATIVE_ALT_INT,
            command: Self::CMD_NAV_WAYPOINT,
            current: true,
            autocontinue: true,
            x: (latitude / Self::COORDINATE_SCALE) as i32,
            y: (longitude / Self::COORDINATE_SCALE) as i32,
            z: altitude as f32,
        }))
        .await?;
        *self.state.write().await = AutopilotState::Flying;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub async fn takeoff(&self, altitude: f64) -> Result<(), BridgeError> {
        self.require_connected().await?;
        info!("Taking off to altitude {altitude:.1} meters");
        let vehicle = *self.vehicle.read().await;
        self.send(UplinkContent::CommandLong(CommandLong {
            target_system: vehicle.system_id,
            target_component: vehicle.component_id,
            command: Self::CMD_NAV_TAKEOFF,
            param7: altitude as f32,
            ..Default::default()
        }))
        .await?;
        *self.state.write().await = AutopilotState::Flying;
        Ok(())
    }

    pub async fn land(&self) -> Result<(), BridgeError> {
        info!("Landing at current position");
        self.set_mode("LAND").await?;
        *self.state.write().await = AutopilotState::Landing;
        Ok(())
    }

    pub async fn return_to_launch(&self) -> Result<(), BridgeError> {
        info!("Returning to launch");
        self.set_mode("RTL").await?;
        *self.state.write().await = AutopilotState::Flying;
        Ok(())
    }

    pub async fn send_command(&self, command: &AutopilotCommand) -> Result<(), BridgeError> {
        self.require_connected().await?;
        info!("Executing command: {command:?}");
        match command {
            AutopilotCommand::Arm => self.arm().await,
            AutopilotCommand::Disarm => self.disarm().await,
            AutopilotCommand::SetMode(mode) => self.set_mode(mode).await,
            AutopilotCommand::Takeoff { altitude } => self.takeoff(*altitude).await,
            AutopilotCommand::Goto { latitude, longitude, altitude } => {
                self.goto(*latitude, *longitude, *altitude).await
            }
            AutopilotCommand::Land => self.land().await,
            AutopilotCommand::ReturnToLaunch => self.return_to_launch().await,
        }
    }

    async fn require_connected(&self) -> Result<(), BridgeError> {
        if self.state.read().await.is_connected() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    async fn send(&self, content: UplinkContent) -> Result<(), BridgeError> {
        let mut guard = self.link.lock().await;
        let result = match guard.as_mut() {
            Some(link) => link.send(content).await,
            None => Err(BridgeError::NotConnected),
        };
        self.settle(&mut guard, result).await
    }

    /// Drops the link and falls back to `Disconnected` if `result` signals link loss.
    async fn settle<T>(
        &self,
        link: &mut Option<AutopilotLink<C::Stream>>,
        result: Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        if let Err(e) = &result {
            if e.is_link_loss() {
                warn!("Autopilot link lost: {e}");
                *link = None;
                *self.state.write().await = AutopilotState::Disconnected;
            }
        }
        result
    }

    /// Reads frames until `select` accepts one or `wait` elapses. Every heartbeat on
    /// the way refreshes the cached vehicle info, other frames are discarded.
    async fn wait_for<T, F>(
        &self,
        link: &mut AutopilotLink<C::Stream>,
        kind: MessageKind,
        wait: Duration,
        mut select: F,
    ) -> Result<T, BridgeError>
    where
        F: FnMut(&DownlinkContent) -> Option<T> + Send,
        T: Send,
    {
        let deadline = Instant::now() + wait;
        loop {
            let Ok(received) = timeout_at(deadline, link.recv()).await else {
                return Err(BridgeError::Timeout(kind));
            };
            let content = received?;
            if let DownlinkContent::Heartbeat(heartbeat) = &content {
                self.vehicle.write().await.absorb(heartbeat);
            }
            if let Some(found) = select(&content) {
                return Ok(found);
            }
        }
    }
}
