mod fail_safe_manager;

pub use fail_safe_manager::{FailSafeManager, FailSafeState};
