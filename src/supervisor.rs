use crate::autopilot::Autopilot;
use crate::cloud::{BrokerLink, InboundCommand, LinkEvent, StoreAndForward, TelemetryMessage};
use crate::config::EdgeConfig;
use crate::fail_safe::FailSafeState;
use crate::imaging::ImageMetadata;
use crate::keychain::Keychain;
use crate::mission::{ExecutorError, ExecutorState};
use crate::obstacle::{DepthFrame, ManeuverKind};
use crate::{critical, debug, error, info, warn};
use chrono::Utc;
use std::time::Duration;
use strum_macros::Display;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Why the supervisor paused the executor. Only the same cause may resume it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
enum PauseCause {
    FailSafe,
    Obstacle,
}

/// Periodic control loop tying the cloud channel, fail-safe, obstacle feed and executor together.
pub struct Supervisor<A: Autopilot + 'static, L: BrokerLink> {
    keychain: Keychain<A>,
    channel: StoreAndForward<L>,
    link_events: mpsc::Receiver<LinkEvent>,
    commands: mpsc::Receiver<InboundCommand>,
    depth_frames: mpsc::Receiver<DepthFrame>,
    telemetry_interval: Duration,
    capture_interval: Duration,
    last_telemetry: Option<Instant>,
    last_capture: Option<Instant>,
    /// Fail-safe state the supervisor last reacted to.
    handled_fail_safe: FailSafeState,
    paused_by: Option<PauseCause>,
}

impl<A: Autopilot + 'static, L: BrokerLink> Supervisor<A, L> {
    const TICK_INTERVAL: Duration = Duration::from_millis(100);
    const DEPTH_QUEUE_CAPACITY: usize = 8;
    const HOLD_MODE: &'static str = "LOITER";

    /// Creates the supervisor around `link` and returns the sender for depth camera frames.
    pub fn new(
        keychain: Keychain<A>,
        config: &EdgeConfig,
        link: L,
        link_events: mpsc::Receiver<LinkEvent>,
    ) -> (Self, mpsc::Sender<DepthFrame>) {
        let (channel, commands) = StoreAndForward::new(link, config.drone_id());
        let (depth_tx, depth_frames) = mpsc::channel(Self::DEPTH_QUEUE_CAPACITY);
        let supervisor = Self {
            keychain,
            channel,
            link_events,
            commands,
            depth_frames,
            telemetry_interval: config.telemetry_interval(),
            capture_interval: config.image_capture_interval(),
            last_telemetry: None,
            last_capture: None,
            handled_fail_safe: FailSafeState::Connected,
            paused_by: None,
        };
        (supervisor, depth_tx)
    }

    /// Ticks every 100 ms until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Supervisor started for drone {}", self.channel.drone_id());
        let mut ticker = tokio::time::interval(Self::TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }
        if self.channel.buffered_len() > 0 {
            warn!("Shutting down with {} unsent cloud messages", self.channel.buffered_len());
        }
        info!("Supervisor stopped");
    }

    pub(crate) async fn tick(&mut self) {
        while let Ok(event) = self.link_events.try_recv() {
            self.channel.handle_event(event).await;
        }
        self.update_fail_safe().await;
        self.check_obstacles().await;

        let now = Instant::now();
        if Self::is_due(self.last_telemetry, self.telemetry_interval, now) {
            self.last_telemetry = Some(now);
            self.report_telemetry().await;
        }
        if Self::is_due(self.last_capture, self.capture_interval, now) && self.capture_image().await {
            self.last_capture = Some(now);
        }
        if self.channel.is_connected() {
            let pipeline_lock = self.keychain.pipeline();
            let mut pipeline = pipeline_lock.lock().await;
            if pipeline.pending_count() > 0 {
                pipeline.process_upload_queue(&mut self.channel).await;
            }
        }
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command).await;
        }
    }

    fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
        last.is_none_or(|at| now.saturating_duration_since(at) >= interval)
    }

    async fn update_fail_safe(&mut self) {
        let (state, hold, ret) = {
            let fail_safe_lock = self.keychain.fail_safe();
            let mut fail_safe = fail_safe_lock.write().await;
            let state = fail_safe.update_connectivity(self.channel.is_connected());
            (state, fail_safe.should_hold(), fail_safe.should_return())
        };
        if state == self.handled_fail_safe {
            return;
        }
        self.handled_fail_safe = state;
        if ret {
            self.return_to_launch("Fail-safe").await;
        } else if hold {
            warn!("Fail-safe: holding position");
            if self.paused_by.is_some() {
                self.paused_by = Some(PauseCause::FailSafe);
            } else if !self.pause_execution(PauseCause::FailSafe).await {
                self.command_hold().await;
            }
        } else if state == FailSafeState::Connected && self.paused_by == Some(PauseCause::FailSafe) {
            self.resume_execution().await;
        }
    }

    async fn check_obstacles(&mut self) {
        let classifier = self.keychain.classifier();
        let mut received = false;
        let mut maneuver = None;
        while let Ok(frame) = self.depth_frames.try_recv() {
            received = true;
            maneuver = classifier.compute_avoidance(&classifier.process_depth_frame(&frame));
        }
        if !received {
            return;
        }
        match maneuver {
            Some(m) if m.kind == ManeuverKind::Hold => {
                if self.paused_by.is_none() {
                    self.pause_execution(PauseCause::Obstacle).await;
                }
            }
            other => {
                if let Some(m) = other {
                    debug!("Advisory avoidance maneuver {} left to the autopilot", m.kind);
                }
                if self.paused_by == Some(PauseCause::Obstacle) {
                    info!("Obstacle cleared, resuming mission");
                    self.resume_execution().await;
                }
            }
        }
    }

    /// Pauses a running segment. Returns `false` if nothing was executing.
    async fn pause_execution(&mut self, cause: PauseCause) -> bool {
        let executor = self.keychain.executor();
        if executor.state().await != ExecutorState::Executing {
            return false;
        }
        if let Err(e) = executor.pause().await {
            error!("Failed to pause mission ({cause}): {e}");
        }
        if executor.state().await == ExecutorState::Paused {
            self.paused_by = Some(cause);
        }
        true
    }

    async fn resume_execution(&mut self) {
        self.paused_by = None;
        let executor = self.keychain.executor();
        if executor.state().await != ExecutorState::Paused {
            return;
        }
        match executor.resume().await {
            Ok(()) => self.spawn_execution(),
            Err(e) => error!("Failed to resume mission: {e}"),
        }
    }

    async fn command_hold(&self) {
        if let Err(e) = self.keychain.autopilot().set_mode(Self::HOLD_MODE).await {
            error!("Failed to command {}: {e}", Self::HOLD_MODE);
        }
    }

    async fn return_to_launch(&mut self, reason: &str) {
        warn!("{reason}: returning to launch");
        self.paused_by = None;
        let executor = self.keychain.executor();
        if executor.state().await != ExecutorState::Idle {
            if let Err(e) = executor.abort().await {
                error!("Failed to abort mission: {e}");
            }
        }
        if let Err(e) = self.keychain.autopilot().return_to_launch().await {
            critical!("Failed to command return to launch: {e}");
        }
    }

    fn spawn_execution(&self) {
        let executor = self.keychain.executor();
        tokio::spawn(async move {
            match executor.execute().await {
                Ok(()) => debug!("Execution task finished"),
                Err(ExecutorError::InvalidState { state, .. }) => {
                    debug!("Execution task found executor {state}, nothing to run");
                }
                Err(e) => error!("Mission execution failed: {e}"),
            }
        });
    }

    async fn report_telemetry(&mut self) {
        let telemetry = match self.keychain.autopilot().get_telemetry().await {
            Ok(telemetry) => telemetry,
            Err(e) => {
                warn!("Failed to read telemetry from autopilot: {e}");
                return;
            }
        };
        let message = TelemetryMessage::position(self.channel.drone_id(), &telemetry, Utc::now());
        if let Err(e) = self.channel.publish_json(&message.topic(), &message).await {
            error!("Failed to encode telemetry report: {e}");
        }
    }

    /// Captures one frame if a segment with image capture is executing.
    async fn capture_image(&mut self) -> bool {
        let executor = self.keychain.executor();
        if executor.state().await != ExecutorState::Executing {
            return false;
        }
        let Some(segment) = executor.segment().await else {
            return false;
        };
        if !segment.capture_images {
            return false;
        }
        let telemetry = match self.keychain.autopilot().get_telemetry().await {
            Ok(telemetry) => telemetry,
            Err(e) => {
                warn!("Skipping image capture, no telemetry: {e}");
                return false;
            }
        };
        let metadata = ImageMetadata::from_telemetry(
            self.channel.drone_id(),
            &segment.mission_id,
            &telemetry,
            Utc::now(),
        );
        let pipeline_lock = self.keychain.pipeline();
        let mut pipeline = pipeline_lock.lock().await;
        let frame = pipeline.capture_frame(metadata);
        pipeline.queue_upload(&frame);
        true
    }

    async fn handle_command(&mut self, command: InboundCommand) {
        match command {
            InboundCommand::MissionSegment(segment) => {
                match self.keychain.executor().load_segment(segment).await {
                    Ok(()) => {
                        self.paused_by = None;
                        self.spawn_execution();
                    }
                    Err(e) => error!("Failed to load mission segment: {e}"),
                }
            }
            InboundCommand::Recall => self.return_to_launch("Recall command received").await,
            InboundCommand::Abort => {
                warn!("Abort command received");
                self.paused_by = None;
                if let Err(e) = self.keychain.executor().abort().await {
                    error!("Failed to abort mission: {e}");
                }
            }
            InboundCommand::UpdateConfig(changes) => {
                let keys: Vec<&str> = changes.keys().map(String::as_str).collect();
                info!("Config update received ({}), not applied at runtime", keys.join(", "));
            }
        }
    }
}
