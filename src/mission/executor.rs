use super::{
    executor_state::ExecutorState,
    geo::haversine_distance,
    progress::WaypointProgress,
    waypoint::{MissionSegment, Waypoint},
};
use crate::autopilot::{Autopilot, BridgeError};
use crate::{info, warn};
use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::time::Duration;
use strum_macros::Display;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug)]
pub enum ExecutorError {
    /// Operation is not legal in the current executor state.
    InvalidState { operation: &'static str, state: ExecutorState },
    /// Segment with the given id has no waypoints.
    EmptySegment(String),
    NoSegment,
    Autopilot(BridgeError),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::InvalidState { operation, state } => {
                write!(f, "cannot {operation} in state {state}")
            }
            ExecutorError::EmptySegment(id) => write!(f, "mission segment {id} contains no waypoints"),
            ExecutorError::NoSegment => write!(f, "no mission segment is loaded"),
            ExecutorError::Autopilot(e) => write!(f, "autopilot command failed: {e}"),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<BridgeError> for ExecutorError {
    fn from(value: BridgeError) -> Self { ExecutorError::Autopilot(value) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Done,
    Interrupted,
}

/// Why a running `execute` stopped before the segment was finished.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
enum Interruption {
    Paused,
    Aborted,
    /// Paused and resumed, or reloaded, since the run started.
    Superseded,
}

/// Sequences the waypoints of one mission segment to the autopilot.
///
/// Shared behind an `Arc`: `execute` runs in its own task while `pause`, `resume`
/// and `abort` are called from the supervisor. A running `execute` observes those
/// calls before every telemetry poll and returns without advancing the waypoint index.
/// Every pause ends the current run, so a resumed segment always restarts with a fresh `goto`.
pub struct MissionExecutor<A: Autopilot> {
    autopilot: Arc<A>,
    state: RwLock<ExecutorState>,
    segment: RwLock<Option<Arc<MissionSegment>>>,
    wp_index: AtomicUsize,
    /// Bumped on every load and pause. A run only continues while it matches its starting value.
    generation: AtomicU64,
    run_lock: Mutex<()>,
    arrival_threshold: f64,
    poll_interval: Duration,
}

impl<A: Autopilot> MissionExecutor<A> {
    const ARRIVAL_THRESHOLD_M: f64 = 2.0;
    const POLL_INTERVAL: Duration = Duration::from_millis(500);
    const HOLD_MODE: &'static str = "LOITER";

    pub fn new(autopilot: Arc<A>) -> Self {
        Self {
            autopilot,
            state: RwLock::new(ExecutorState::Idle),
            segment: RwLock::new(None),
            wp_index: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            run_lock: Mutex::new(()),
            arrival_threshold: Self::ARRIVAL_THRESHOLD_M,
            poll_interval: Self::POLL_INTERVAL,
        }
    }

    pub async fn state(&self) -> ExecutorState { *self.state.read().await }

    pub fn current_index(&self) -> usize { self.wp_index.load(Ordering::SeqCst) }

    pub async fn segment(&self) -> Option<Arc<MissionSegment>> { self.segment.read().await.clone() }

    /// Loads `segment` and moves to `Executing`. Legal from `Idle`, `Completed` and `Aborted`.
    pub async fn load_segment(&self, segment: Arc<MissionSegment>) -> Result<(), ExecutorError> {
        let mut state = self.state.write().await;
        if !state.accepts_segment() {
            return Err(ExecutorError::InvalidState { operation: "load segment", state: *state });
        }
        if segment.waypoints.is_empty() {
            return Err(ExecutorError::EmptySegment(segment.segment_id.clone()));
        }
        info!(
            "Loading mission segment {} ({} waypoints) for mission {}",
            segment.segment_id,
            segment.waypoints.len(),
            segment.mission_id
        );
        *state = ExecutorState::Loading;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.wp_index.store(0, Ordering::SeqCst);
        *self.segment.write().await = Some(segment);
        *state = ExecutorState::Executing;
        info!("Mission segment loaded and ready for execution");
        Ok(())
    }

    /// Flies the loaded segment from the current waypoint index.
    ///
    /// Returns `Ok` once the segment is completed or the executor was paused or
    /// aborted. A second concurrent call waits for the first to return.
    pub async fn execute(&self) -> Result<(), ExecutorError> {
        let _running = self.run_lock.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);
        let current = self.state().await;
        if current != ExecutorState::Executing {
            return Err(ExecutorError::InvalidState { operation: "execute", state: current });
        }
        let segment = self.segment().await.ok_or(ExecutorError::NoSegment)?;
        let total = segment.waypoints.len();
        info!("Beginning execution of segment {} ({total} waypoints)", segment.segment_id);

        loop {
            let index = self.wp_index.load(Ordering::SeqCst);
            let Some(waypoint) = segment.waypoints.get(index) else {
                break;
            };
            if let Some(stopped) = self.interruption(generation).await {
                info!("Execution {stopped} at waypoint {index}");
                return Ok(());
            }
            info!(
                "Navigating to waypoint {}/{total} (lat={:.7}, lon={:.7}, alt={:.1})",
                index + 1,
                waypoint.latitude(),
                waypoint.longitude(),
                waypoint.altitude()
            );
            if self.navigate_to(waypoint, generation).await? == Leg::Interrupted {
                return Ok(());
            }
            if !waypoint.loiter_time().is_zero() {
                info!("Loitering at waypoint {} for {:?}", index + 1, waypoint.loiter_time());
                if self.loiter(waypoint.loiter_time(), generation).await == Leg::Interrupted {
                    return Ok(());
                }
            }
            self.wp_index.store(index + 1, Ordering::SeqCst);
        }

        let mut state = self.state.write().await;
        if *state == ExecutorState::Executing
            && self.generation.load(Ordering::SeqCst) == generation
        {
            *state = ExecutorState::Completed;
            info!("Mission segment {} completed", segment.segment_id);
        }
        Ok(())
    }

    /// Commands the autopilot to hold position and stops a running `execute`.
    pub async fn pause(&self) -> Result<(), ExecutorError> {
        {
            let mut state = self.state.write().await;
            if *state != ExecutorState::Executing {
                return Err(ExecutorError::InvalidState { operation: "pause", state: *state });
            }
            *state = ExecutorState::Paused;
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.autopilot.set_mode(Self::HOLD_MODE).await?;
        info!("Mission execution paused at waypoint {}", self.current_index());
        Ok(())
    }

    /// Marks the executor `Executing` again; the caller restarts `execute`.
    pub async fn resume(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.write().await;
        if *state != ExecutorState::Paused {
            return Err(ExecutorError::InvalidState { operation: "resume", state: *state });
        }
        *state = ExecutorState::Executing;
        info!("Mission execution resumed at waypoint {}", self.current_index());
        Ok(())
    }

    /// Terminally stops the segment and commands the autopilot to hold. Illegal while `Idle`.
    pub async fn abort(&self) -> Result<(), ExecutorError> {
        let previous = {
            let mut state = self.state.write().await;
            if *state == ExecutorState::Idle {
                return Err(ExecutorError::InvalidState { operation: "abort", state: *state });
            }
            std::mem::replace(&mut *state, ExecutorState::Aborted)
        };
        self.autopilot.set_mode(Self::HOLD_MODE).await?;
        warn!(
            "Mission execution aborted (was {previous} at waypoint {})",
            self.current_index()
        );
        Ok(())
    }

    pub async fn get_progress(&self) -> Result<WaypointProgress, ExecutorError> {
        let segment = self.segment().await.ok_or(ExecutorError::NoSegment)?;
        let index = self.current_index();
        let total = segment.waypoints.len();

        let distance_to_next_meters = match segment.waypoints.get(index) {
            Some(target) => match self.autopilot.get_telemetry().await {
                Ok(t) => haversine_distance(
                    t.latitude(),
                    t.longitude(),
                    target.latitude(),
                    target.longitude(),
                ),
                Err(e) => {
                    warn!("Could not get telemetry for progress calculation: {e}");
                    0.0
                }
            },
            None => 0.0,
        };
        let remaining = total.saturating_sub(index) as u64;

        Ok(WaypointProgress {
            segment_id: segment.segment_id.clone(),
            current_waypoint_index: index,
            total_waypoints: total,
            distance_to_next_meters,
            estimated_time_remaining: Duration::from_secs(
                remaining * WaypointProgress::SECONDS_PER_WAYPOINT,
            ),
        })
    }

    async fn navigate_to(&self, target: &Waypoint, generation: u64) -> Result<Leg, ExecutorError> {
        self.autopilot.goto(target.latitude(), target.longitude(), target.altitude()).await?;
        loop {
            if self.interruption(generation).await.is_some() {
                return Ok(Leg::Interrupted);
            }
            match self.autopilot.get_telemetry().await {
                Ok(t) => {
                    let distance = haversine_distance(
                        t.latitude(),
                        t.longitude(),
                        target.latitude(),
                        target.longitude(),
                    );
                    if distance <= self.arrival_threshold {
                        info!(
                            "Arrived at waypoint (lat={:.7}, lon={:.7})",
                            target.latitude(),
                            target.longitude()
                        );
                        return Ok(Leg::Done);
                    }
                }
                Err(e) => warn!("Telemetry read failed during navigation, retrying: {e}"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn loiter(&self, duration: Duration, generation: u64) -> Leg {
        let deadline = tokio::time::Instant::now() + duration;
        while tokio::time::Instant::now() < deadline {
            if self.interruption(generation).await.is_some() {
                return Leg::Interrupted;
            }
            tokio::time::sleep_until(deadline.min(tokio::time::Instant::now() + self.poll_interval))
                .await;
        }
        Leg::Done
    }

    async fn interruption(&self, generation: u64) -> Option<Interruption> {
        match self.state().await {
            ExecutorState::Paused => Some(Interruption::Paused),
            ExecutorState::Aborted => Some(Interruption::Aborted),
            _ if self.generation.load(Ordering::SeqCst) != generation => {
                Some(Interruption::Superseded)
            }
            _ => None,
        }
    }
}
