use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Loading,
    Executing,
    Paused,
    Completed,
    Aborted,
}

impl ExecutorState {
    /// States from which a new segment may be loaded.
    pub fn accepts_segment(self) -> bool {
        matches!(self, ExecutorState::Idle | ExecutorState::Completed | ExecutorState::Aborted)
    }
}
