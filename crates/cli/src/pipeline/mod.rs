//! Replay session orchestration module.

mod session;
mod stats;

pub use session::{ReplayPlan, ReplaySessionRunner};
pub use stats::SessionStats;
