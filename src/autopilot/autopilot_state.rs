use strum_macros::Display;

/// Connection and flight state of the autopilot as tracked by the bridge.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum AutopilotState {
    Disconnected,
    Connecting,
    Connected,
    Armed,
    Flying,
    Landing,
    Landed,
}

impl AutopilotState {
    /// `true` for every state that has a live link with a confirmed heartbeat.
    pub fn is_connected(self) -> bool {
        !matches!(self, AutopilotState::Disconnected | AutopilotState::Connecting)
    }
}
