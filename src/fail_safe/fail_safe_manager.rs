use crate::config::EdgeConfig;
use crate::{info, warn};
use std::time::Duration;
use strum_macros::Display;
use tokio::time::Instant;

/// Escalation level while the cloud link is down, ordered by severity.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum FailSafeState {
    Connected,
    Degraded,
    Holding,
    Returning,
}

/// Escalates through [`FailSafeState`] by how long the cloud link has been down.
///
/// While disconnected the state only ever rises; a single connected report resets it.
#[derive(Debug)]
pub struct FailSafeManager {
    degraded_after: Duration,
    holding_after: Duration,
    return_after: Duration,
    state: FailSafeState,
    disconnected_since: Option<Instant>,
}

impl FailSafeManager {
    pub fn new(degraded_after: Duration, holding_after: Duration, return_after: Duration) -> Self {
        Self {
            degraded_after,
            holding_after,
            return_after,
            state: FailSafeState::Connected,
            disconnected_since: None,
        }
    }

    pub fn from_config(config: &EdgeConfig) -> Self {
        let (degraded, holding, ret) = config.fail_safe_thresholds();
        Self::new(degraded, holding, ret)
    }

    pub fn state(&self) -> FailSafeState { self.state }

    pub fn update_connectivity(&mut self, connected: bool) -> FailSafeState {
        self.update_connectivity_at(connected, Instant::now())
    }

    /// Same as [`Self::update_connectivity`] with an explicit monotonic clock reading.
    pub fn update_connectivity_at(&mut self, connected: bool, now: Instant) -> FailSafeState {
        if connected {
            if self.state != FailSafeState::Connected {
                info!(
                    "Connectivity restored (was {} for {:.1}s)",
                    self.state,
                    self.elapsed(now).as_secs_f64()
                );
            }
            self.state = FailSafeState::Connected;
            self.disconnected_since = None;
            return self.state;
        }

        let since = *self.disconnected_since.get_or_insert_with(|| {
            warn!("Connectivity lost, starting fail-safe timer");
            now
        });
        let elapsed = now.saturating_duration_since(since);
        let reached = if elapsed >= self.return_after {
            FailSafeState::Returning
        } else if elapsed >= self.holding_after {
            FailSafeState::Holding
        } else if elapsed >= self.degraded_after {
            FailSafeState::Degraded
        } else {
            FailSafeState::Connected
        };
        if reached > self.state {
            warn!(
                "Fail-safe state transition: {} -> {reached} (disconnected for {:.1}s)",
                self.state,
                elapsed.as_secs_f64()
            );
            self.state = reached;
        }
        self.state
    }

    pub fn should_hold(&self) -> bool { self.state == FailSafeState::Holding }

    pub fn should_return(&self) -> bool { self.state == FailSafeState::Returning }

    pub fn reset(&mut self) {
        if self.state != FailSafeState::Connected {
            info!("Fail-safe reset from {} to {}", self.state, FailSafeState::Connected);
        }
        self.state = FailSafeState::Connected;
        self.disconnected_since = None;
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.disconnected_since.map_or(Duration::ZERO, |since| now.saturating_duration_since(since))
    }
}
